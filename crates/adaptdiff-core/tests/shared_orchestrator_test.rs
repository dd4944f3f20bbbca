//! Integration test: one session driven from several threads.
//!
//! Validates that:
//! 1. Concurrent event feeders never lose an update behind the mutex.
//! 2. Frames and events interleaved across threads keep multipliers bounded.
//! 3. Operator commands from another thread are visible to every clone.
//!
//! Run: cargo test -p adaptdiff-core --test shared_orchestrator_test

use adaptdiff_core::{
    Axis, CombatEvent, ControlMode, DamageEvent, DdaConfig, EntityId, EntityRef, FrameInput,
    HostWorld, PowerAttributes, SharedOrchestrator, TrackedPlayer,
};

struct NullWorld;

impl HostWorld for NullWorld {
    fn live_opponents(&self) -> Vec<EntityId> {
        vec![500, 501]
    }

    fn apply_multiplier(&mut self, _entity: EntityId, _axis: Axis, _value: f64) {}
}

fn frame(engaged: bool) -> FrameInput {
    FrameInput {
        dt: 0.05,
        player: Some(TrackedPlayer {
            id: 1,
            attributes: PowerAttributes {
                max_health: 100.0,
                damage_per_hit: 10.0,
                attacks_per_second: 2.0,
                ..PowerAttributes::default()
            },
            engaged,
            health_fraction: 0.8,
        }),
    }
}

fn incoming(amount: f64) -> CombatEvent {
    CombatEvent::Damage(DamageEvent {
        attacker: Some(EntityRef::opponent(500)),
        victim: EntityRef::player(1),
        amount,
        dt: 0.25,
    })
}

#[test]
fn concurrent_events_are_all_counted() {
    let mut config = DdaConfig::adaptive();
    config.step_interval_seconds = 1.0;
    let shared = SharedOrchestrator::new(config);
    shared.tick_frame(&frame(true), &mut NullWorld);

    std::thread::scope(|scope| {
        for worker in 0..4_u32 {
            let handle = shared.clone();
            scope.spawn(move || {
                let mut world = NullWorld;
                for i in 0..250_u32 {
                    handle.handle_event(&incoming(f64::from(worker * 10 + i % 7 + 1)), &mut world);
                }
            });
        }
        let ticker = shared.clone();
        scope.spawn(move || {
            let mut world = NullWorld;
            for i in 0..400 {
                ticker.tick_frame(&frame(i % 5 != 0), &mut world);
            }
        });
    });

    let metrics = shared.with(|orch| orch.metrics().snapshot());
    assert_eq!(metrics.damage_events, 1000);
    assert_eq!(metrics.dropped_inputs, 0);
    assert!(metrics.decision_steps > 0);

    let snap = shared.snapshot();
    for row in &snap.axes {
        assert!(row.actuator_multiplier >= snap.limits.floor);
        assert!(row.actuator_multiplier <= snap.limits.cap);
    }
    assert!(snap.sensors.is_some_and(|s| s.is_bounded()));
}

#[test]
fn commands_from_another_thread_are_visible() {
    let shared = SharedOrchestrator::new(DdaConfig::adaptive());
    let operator = shared.clone();
    std::thread::spawn(move || {
        operator.override_multiplier(Axis::AttackDamage, 3.0, &mut NullWorld);
        operator.set_mode(ControlMode::Observe);
    })
    .join()
    .expect("operator thread");

    assert_eq!(shared.multiplier(Axis::AttackDamage), 3.0);
    assert_eq!(shared.snapshot().mode, ControlMode::Observe);
    shared.reset();
    assert_eq!(shared.with(|orch| orch.metrics().snapshot().overrides), 1);
}
