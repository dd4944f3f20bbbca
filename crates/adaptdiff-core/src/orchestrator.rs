//! Decision orchestrator: owns one tracked-player session.
//!
//! One instance owns the sampler, the power estimator, the actuator state,
//! the per-axis controllers and the step clock. The host drives it with:
//! - [`DecisionOrchestrator::tick_frame`] once per simulation tick,
//! - [`DecisionOrchestrator::handle_event`] (or the `on_*` methods) for each
//!   combat event,
//! - the command setters for operator input.
//!
//! Learning only accrues while the tracked player is engaged. A missing
//! player, a new player identity, a mode switch and an explicit reset all
//! clear sampler, power, controllers and clock together. Actuator values
//! survive those resets; `reset_actuators` is the separate command for them.

use serde::{Deserialize, Serialize};

use crate::actuators::{ActuatorState, HostWorld};
use crate::axis::Axis;
use crate::config::{ControlMode, DdaConfig, GeneLimits};
use crate::decision::axis_controller::{AxisController, AxisState, AxisTuning, SyncOutcome};
use crate::decision::skill::SkillWeights;
use crate::decision::step_clock::StepClock;
use crate::events::{CombatEvent, DamageEvent, DamageRoute, EntityId, EntityRef, Side};
use crate::metrics::DirectorMetrics;
use crate::power::{PowerAttributes, PowerEstimator, PowerSample};
use crate::snapshot::{AxisRow, DirectorSnapshot};
use crate::telemetry::{NormTargets, SensorConfig, SensorSample, TelemetrySampler};

/// Per-tick view of the tracked player.
///
/// `id` must stay stable across respawns of the same player; a different id
/// is treated as a new session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedPlayer {
    pub id: EntityId,
    #[serde(default)]
    pub attributes: PowerAttributes,
    #[serde(default)]
    pub engaged: bool,
    #[serde(default = "full_health")]
    pub health_fraction: f64,
}

fn full_health() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub dt: f64,
    /// `None` when no player is present (idle).
    pub player: Option<TrackedPlayer>,
}

/// Why a decision tick did no stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotAdaptive,
    NoSample,
    Inactive,
    InvalidDt,
    NotDue,
}

/// Result of one decision tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StepOutcome {
    /// Whole intervals consumed this tick.
    pub due_steps: u32,
    /// Due steps in which at least one axis stepped.
    pub executed_steps: u32,
    /// Axes whose multiplier moved, over all executed steps.
    pub changed_axes: [bool; Axis::COUNT],
    /// Batched world applications (at most one per executed step).
    pub applications: u32,
    pub entities_updated: usize,
    pub skipped: Option<SkipReason>,
}

impl StepOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn changed(&self) -> bool {
        self.changed_axes.iter().any(|c| *c)
    }
}

/// Why tracking state was cleared during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetCause {
    PlayerLost,
    PlayerChanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub tracked: Option<EntityId>,
    pub reset: Option<ResetCause>,
    pub step: StepOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OverrideOutcome {
    /// Stored and pushed to every live opponent.
    Applied { stored: f64, entities: usize },
    /// Stored only; the mode does not touch the world.
    Stored { stored: f64 },
    /// Non-finite value, nothing changed.
    Rejected,
}

#[derive(Debug)]
pub struct DecisionOrchestrator {
    config: DdaConfig,
    sampler: TelemetrySampler,
    power: PowerEstimator,
    actuators: ActuatorState,
    controllers: [AxisController; Axis::COUNT],
    clock: StepClock,
    tracked: Option<EntityId>,
    latest_sample: Option<SensorSample>,
    latest_power: Option<PowerSample>,
    metrics: DirectorMetrics,
}

impl DecisionOrchestrator {
    #[must_use]
    pub fn new(config: DdaConfig) -> Self {
        let config = config.sanitized();
        let controllers = Axis::ALL.map(|axis| {
            let mut ctl = AxisController::new(axis, config.tuning.get(axis));
            ctl.set_enabled(config.axes.get(axis));
            ctl
        });
        Self {
            sampler: TelemetrySampler::new(config.sensors, config.normalization),
            power: PowerEstimator::new(config.sensors.tau_seconds),
            actuators: ActuatorState::new(config.limits),
            controllers,
            clock: StepClock::new(config.step_interval_seconds),
            tracked: None,
            latest_sample: None,
            latest_power: None,
            metrics: DirectorMetrics::new(),
            config,
        }
    }

    // --- accessors ---

    #[must_use]
    pub fn config(&self) -> &DdaConfig {
        &self.config
    }

    #[must_use]
    pub fn mode(&self) -> ControlMode {
        self.config.mode
    }

    #[must_use]
    pub fn actuators(&self) -> &ActuatorState {
        &self.actuators
    }

    #[must_use]
    pub fn multiplier(&self, axis: Axis) -> f64 {
        self.actuators.get(axis)
    }

    #[must_use]
    pub fn axis_state(&self, axis: Axis) -> AxisState {
        self.controllers[axis.index()].state()
    }

    #[must_use]
    pub fn axis_states(&self) -> [AxisState; Axis::COUNT] {
        Axis::ALL.map(|axis| self.axis_state(axis))
    }

    #[must_use]
    pub fn latest_sample(&self) -> Option<SensorSample> {
        self.latest_sample
    }

    #[must_use]
    pub fn latest_power(&self) -> Option<PowerSample> {
        self.latest_power
    }

    #[must_use]
    pub fn tracked_player(&self) -> Option<EntityId> {
        self.tracked
    }

    #[must_use]
    pub fn step_clock(&self) -> &StepClock {
        &self.clock
    }

    #[must_use]
    pub fn sampler(&self) -> &TelemetrySampler {
        &self.sampler
    }

    #[must_use]
    pub fn metrics(&self) -> &DirectorMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn snapshot(&self) -> DirectorSnapshot {
        DirectorSnapshot {
            mode: self.config.mode,
            tracked_player: self.tracked,
            limits: self.actuators.limits(),
            step_interval_seconds: self.clock.interval_seconds(),
            accumulated_seconds: self.clock.accumulated_seconds(),
            seconds_until_next_step: self.clock.seconds_until_next(),
            axes: Axis::ALL
                .iter()
                .map(|&axis| AxisRow {
                    state: self.axis_state(axis),
                    actuator_multiplier: self.actuators.get(axis),
                })
                .collect(),
            sensors: self.latest_sample,
            power: self.latest_power,
            metrics: self.metrics.snapshot(),
        }
    }

    // --- per-tick driving ---

    /// Advance one simulation tick: identity tracking, sensors, power, and
    /// (in adaptive mode) the decision clock.
    pub fn tick_frame<W: HostWorld + ?Sized>(
        &mut self,
        frame: &FrameInput,
        world: &mut W,
    ) -> FrameReport {
        if !self.config.mode.tracks_player() {
            return FrameReport::default();
        }
        // The idle transition does not depend on a usable dt.
        let Some(player) = frame.player else {
            let reset = self.tracked.is_some().then_some(ResetCause::PlayerLost);
            if reset.is_some() {
                self.reset_session();
            }
            return FrameReport {
                tracked: None,
                reset,
                step: StepOutcome::skipped(SkipReason::NoSample),
            };
        };

        if !(frame.dt.is_finite() && frame.dt > 0.0) {
            DirectorMetrics::inc(&self.metrics.dropped_inputs);
            return FrameReport {
                tracked: self.tracked,
                ..FrameReport::default()
            };
        }

        let mut reset = None;
        if self.tracked != Some(player.id) {
            if self.tracked.is_some() {
                self.reset_session();
                reset = Some(ResetCause::PlayerChanged);
            }
            self.tracked = Some(player.id);
        }

        DirectorMetrics::inc(&self.metrics.frames);
        if !self
            .sampler
            .tick_state(player.engaged, player.health_fraction, frame.dt)
        {
            DirectorMetrics::inc(&self.metrics.dropped_inputs);
        }
        let power = self.power.compute_smoothed(&player.attributes, frame.dt);
        self.latest_power = Some(power);
        self.latest_sample = Some(self.sampler.sample(Some(&power)));

        let step = self.tick_decision(player.engaged, frame.dt, world);
        FrameReport {
            tracked: self.tracked,
            reset,
            step,
        }
    }

    /// Accrue active time and run every due step.
    ///
    /// Nothing accrues unless the mode is adaptive, a sensor sample exists and
    /// the player is active. Each executed step steps every enabled axis and,
    /// if any multiplier moved, applies the actuators to the world once.
    pub fn tick_decision<W: HostWorld + ?Sized>(
        &mut self,
        is_active: bool,
        dt: f64,
        world: &mut W,
    ) -> StepOutcome {
        if !self.config.mode.adapts() {
            return StepOutcome::skipped(SkipReason::NotAdaptive);
        }
        let Some(sample) = self.latest_sample else {
            return StepOutcome::skipped(SkipReason::NoSample);
        };
        if !is_active {
            return StepOutcome::skipped(SkipReason::Inactive);
        }
        if !self.clock.accrue(dt) {
            DirectorMetrics::inc(&self.metrics.dropped_inputs);
            return StepOutcome::skipped(SkipReason::InvalidDt);
        }

        let due = self.clock.consume_due();
        if due == 0 {
            return StepOutcome::skipped(SkipReason::NotDue);
        }

        let mut outcome = StepOutcome {
            due_steps: due,
            ..StepOutcome::default()
        };
        for _ in 0..due {
            if !self.controllers.iter().any(AxisController::enabled) {
                DirectorMetrics::inc(&self.metrics.skipped_steps);
                continue;
            }
            let mut changed = false;
            for ctl in self.controllers.iter_mut().filter(|c| c.enabled()) {
                if ctl.sync(&self.actuators) == SyncOutcome::Resynced {
                    DirectorMetrics::inc(&self.metrics.resyncs);
                }
                let weights = self.config.skill.get(ctl.axis());
                if ctl.step(&sample, weights, &mut self.actuators) {
                    changed = true;
                    outcome.changed_axes[ctl.axis().index()] = true;
                }
            }
            outcome.executed_steps += 1;
            DirectorMetrics::inc(&self.metrics.decision_steps);

            if changed {
                let entities = self.actuators.apply_to_all(world);
                outcome.applications += 1;
                outcome.entities_updated += entities;
                DirectorMetrics::inc(&self.metrics.applications);
                DirectorMetrics::add(&self.metrics.entities_updated, entities as u64);
            }
        }
        outcome
    }

    // --- event feed ---

    /// Route one damage event to the sampler.
    pub fn on_damage(&mut self, event: &DamageEvent) -> DamageRoute {
        let Some(player) = self.tracked.filter(|_| self.config.mode.tracks_player()) else {
            return DamageRoute::Ignored;
        };
        let accepted = if event.victim.id == player {
            Some((
                DamageRoute::Incoming,
                self.sampler.observe_incoming_damage(event.amount, event.dt),
            ))
        } else if event.attacker.is_some_and(|a| a.id == player)
            && event.victim.side == Side::Opponent
        {
            Some((
                DamageRoute::Outgoing,
                self.sampler
                    .observe_outgoing_damage(event.amount, event.dt, event.victim.id),
            ))
        } else {
            None
        };

        match accepted {
            Some((route, true)) => {
                DirectorMetrics::inc(&self.metrics.damage_events);
                route
            }
            Some((_, false)) => {
                DirectorMetrics::inc(&self.metrics.dropped_inputs);
                DamageRoute::Rejected
            }
            None => DamageRoute::Ignored,
        }
    }

    /// Record a defeat. Returns true when the sampler recorded something.
    pub fn on_defeated(&mut self, victim: EntityRef) -> bool {
        let Some(player) = self.tracked.filter(|_| self.config.mode.tracks_player()) else {
            return false;
        };
        if victim.id == player {
            self.sampler.observe_self_defeated();
            true
        } else if victim.side == Side::Opponent {
            self.sampler.observe_target_defeated(victim.id)
        } else {
            false
        }
    }

    /// Bring a freshly spawned opponent up to the current multipliers.
    pub fn on_spawn<W: HostWorld + ?Sized>(&mut self, entity: EntityRef, world: &mut W) -> bool {
        if !self.config.mode.adapts() || entity.side != Side::Opponent {
            return false;
        }
        self.actuators.apply_to_entity(world, entity.id);
        DirectorMetrics::inc(&self.metrics.entities_updated);
        true
    }

    pub fn handle_event<W: HostWorld + ?Sized>(&mut self, event: &CombatEvent, world: &mut W) {
        match event {
            CombatEvent::Damage(damage) => {
                self.on_damage(damage);
            }
            CombatEvent::Defeated { victim } => {
                self.on_defeated(*victim);
            }
            CombatEvent::Spawned { entity } => {
                self.on_spawn(*entity, world);
            }
        }
    }

    // --- commands ---

    /// Switch mode. Any actual change clears the session.
    pub fn set_mode(&mut self, mode: ControlMode) -> bool {
        if mode == self.config.mode {
            return false;
        }
        self.config.mode = mode;
        self.reset_session();
        true
    }

    /// Replace the multiplier range. Stored multipliers are re-clamped and the
    /// controllers pick up any clamping through their sync path.
    pub fn set_limits(&mut self, limits: GeneLimits) -> GeneLimits {
        self.actuators.set_limits(limits);
        self.config.limits = self.actuators.limits();
        self.config.limits
    }

    /// Returns the interval actually in effect after clamping.
    pub fn set_step_interval(&mut self, seconds: f64) -> f64 {
        self.clock.set_interval(seconds);
        self.config.step_interval_seconds = self.clock.interval_seconds();
        self.config.step_interval_seconds
    }

    pub fn set_axis_enabled(&mut self, axis: Axis, enabled: bool) {
        self.config.axes.set(axis, enabled);
        self.controllers[axis.index()].set_enabled(enabled);
    }

    pub fn set_skill_weights(&mut self, axis: Axis, weights: SkillWeights) {
        self.config.skill.set(axis, weights);
    }

    /// Replace smoothing parameters and normalization targets. Accumulated
    /// sensor state is kept; the new values apply from the next sample.
    pub fn set_sensor_config(&mut self, sensors: SensorConfig, normalization: NormTargets) {
        self.sampler.reconfigure(sensors, normalization);
        self.config.sensors = self.sampler.config();
        self.config.normalization = self.sampler.targets();
        self.power.set_tau(self.config.sensors.tau_seconds);
    }

    pub fn set_tuning(&mut self, axis: Axis, tuning: AxisTuning) {
        let ctl = &mut self.controllers[axis.index()];
        ctl.set_tuning(tuning);
        self.config.tuning.set(axis, ctl.tuning());
    }

    /// Directly set one multiplier. The axis controller re-seeds from it at
    /// once, dropping its momentum.
    pub fn override_multiplier<W: HostWorld + ?Sized>(
        &mut self,
        axis: Axis,
        value: f64,
        world: &mut W,
    ) -> OverrideOutcome {
        let Some(write) = self.actuators.set(axis, value) else {
            DirectorMetrics::inc(&self.metrics.dropped_inputs);
            return OverrideOutcome::Rejected;
        };
        DirectorMetrics::inc(&self.metrics.overrides);
        if self.controllers[axis.index()].sync(&self.actuators) == SyncOutcome::Resynced {
            DirectorMetrics::inc(&self.metrics.resyncs);
        }
        if self.config.mode.adapts() {
            let entities = self.actuators.apply_to_all(world);
            DirectorMetrics::inc(&self.metrics.applications);
            DirectorMetrics::add(&self.metrics.entities_updated, entities as u64);
            OverrideOutcome::Applied {
                stored: write.stored,
                entities,
            }
        } else {
            OverrideOutcome::Stored {
                stored: write.stored,
            }
        }
    }

    /// Clear all learning state (sampler, power, controllers, clock).
    pub fn reset(&mut self) {
        self.reset_session();
    }

    /// Every actuator back to neutral. Returns the entities updated.
    pub fn reset_actuators<W: HostWorld + ?Sized>(&mut self, world: &mut W) -> usize {
        self.actuators.reset();
        if !self.config.mode.adapts() {
            return 0;
        }
        let entities = self.actuators.apply_to_all(world);
        DirectorMetrics::inc(&self.metrics.applications);
        DirectorMetrics::add(&self.metrics.entities_updated, entities as u64);
        entities
    }

    fn reset_session(&mut self) {
        self.sampler.reset();
        self.power.reset();
        for ctl in &mut self.controllers {
            ctl.reset();
        }
        self.clock.reset();
        self.tracked = None;
        self.latest_sample = None;
        self.latest_power = None;
        DirectorMetrics::inc(&self.metrics.resets);
    }
}

impl Default for DecisionOrchestrator {
    fn default() -> Self {
        Self::new(DdaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct World {
        opponents: Vec<EntityId>,
        applied: Vec<(EntityId, Axis, f64)>,
    }

    impl HostWorld for World {
        fn live_opponents(&self) -> Vec<EntityId> {
            self.opponents.clone()
        }

        fn apply_multiplier(&mut self, entity: EntityId, axis: Axis, value: f64) {
            self.applied.push((entity, axis, value));
        }
    }

    fn player(id: EntityId, engaged: bool) -> TrackedPlayer {
        TrackedPlayer {
            id,
            attributes: PowerAttributes {
                max_health: 120.0,
                damage_per_hit: 12.0,
                attacks_per_second: 1.0,
                move_speed: 7.0,
                ..PowerAttributes::default()
            },
            engaged,
            health_fraction: 1.0,
        }
    }

    fn frame(dt: f64, p: Option<TrackedPlayer>) -> FrameInput {
        FrameInput { dt, player: p }
    }

    #[test]
    fn off_mode_ignores_everything() {
        let mut orch = DecisionOrchestrator::default();
        let mut world = World::default();
        let report = orch.tick_frame(&frame(1.0, Some(player(1, true))), &mut world);
        assert_eq!(report, FrameReport::default());
        assert!(orch.tracked_player().is_none());
        assert!(orch.latest_sample().is_none());
    }

    #[test]
    fn step_gating_follows_active_time() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        let mut total_due = 0;
        for _ in 0..99 {
            total_due += orch
                .tick_frame(&frame(0.1, Some(player(1, true))), &mut world)
                .step
                .due_steps;
        }
        assert_eq!(total_due, 0);

        // Idle-but-present frames do not accrue.
        for _ in 0..50 {
            let report = orch.tick_frame(&frame(0.1, Some(player(1, false))), &mut world);
            assert_eq!(report.step.skipped, Some(SkipReason::Inactive));
        }
        let report = orch.tick_frame(&frame(0.2, Some(player(1, true))), &mut world);
        assert_eq!(report.step.due_steps, 1);
        assert!((orch.step_clock().accumulated_seconds() - 0.1).abs() < 1e-6);

        let report = orch.tick_frame(&frame(25.0, Some(player(1, true))), &mut world);
        assert_eq!(report.step.due_steps, 2);
        assert_eq!(orch.metrics().snapshot().decision_steps, 3);
    }

    #[test]
    fn player_loss_and_change_reset_session() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        orch.tick_frame(&frame(5.0, Some(player(1, true))), &mut world);
        assert!(orch.step_clock().accumulated_seconds() > 0.0);

        let report = orch.tick_frame(&frame(0.1, Some(player(2, true))), &mut world);
        assert_eq!(report.reset, Some(ResetCause::PlayerChanged));
        assert_eq!(orch.tracked_player(), Some(2));
        assert!((orch.step_clock().accumulated_seconds() - 0.1).abs() < 1e-12);

        let report = orch.tick_frame(&frame(0.1, None), &mut world);
        assert_eq!(report.reset, Some(ResetCause::PlayerLost));
        assert!(orch.latest_sample().is_none());
        assert_eq!(orch.step_clock().accumulated_seconds(), 0.0);
        assert!(orch.latest_power().is_none());

        let report = orch.tick_frame(&frame(0.1, None), &mut world);
        assert_eq!(report.reset, None);
        assert_eq!(orch.metrics().snapshot().resets, 2);
    }

    #[test]
    fn damage_routing() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        let hit = DamageEvent {
            attacker: Some(EntityRef::opponent(9)),
            victim: EntityRef::player(1),
            amount: 10.0,
            dt: 0.5,
        };
        assert_eq!(orch.on_damage(&hit), DamageRoute::Ignored);

        orch.tick_frame(&frame(0.1, Some(player(1, true))), &mut world);
        assert_eq!(orch.on_damage(&hit), DamageRoute::Incoming);

        let dealt = DamageEvent {
            attacker: Some(EntityRef::player(1)),
            victim: EntityRef::opponent(9),
            amount: 30.0,
            dt: 0.25,
        };
        assert_eq!(orch.on_damage(&dealt), DamageRoute::Outgoing);
        assert_eq!(orch.sampler().tracked_targets(), 1);

        let ally = DamageEvent {
            attacker: Some(EntityRef::player(1)),
            victim: EntityRef::new(5, Side::Neutral),
            ..dealt
        };
        assert_eq!(orch.on_damage(&ally), DamageRoute::Ignored);

        let bad = DamageEvent {
            amount: f64::NAN,
            ..hit
        };
        assert_eq!(orch.on_damage(&bad), DamageRoute::Rejected);

        assert!(orch.on_defeated(EntityRef::opponent(9)));
        assert!(!orch.on_defeated(EntityRef::opponent(77)));
        assert!(orch.on_defeated(EntityRef::player(1)));
        assert_eq!(orch.metrics().snapshot().damage_events, 2);
    }

    #[test]
    fn spawn_gets_current_multipliers_only_when_adaptive() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        orch.override_multiplier(Axis::MaxHealth, 1.5, &mut world);
        world.applied.clear();

        assert!(orch.on_spawn(EntityRef::opponent(3), &mut world));
        assert_eq!(world.applied.len(), Axis::COUNT);
        assert!(world.applied.contains(&(3, Axis::MaxHealth, 1.5)));
        assert!(!orch.on_spawn(EntityRef::player(4), &mut world));

        orch.set_mode(ControlMode::Observe);
        assert!(!orch.on_spawn(EntityRef::opponent(5), &mut world));
    }

    #[test]
    fn override_applies_and_controller_resyncs() {
        let mut config = DdaConfig::adaptive();
        config.step_interval_seconds = 1.0;
        let mut orch = DecisionOrchestrator::new(config);
        let mut world = World {
            opponents: vec![10, 11],
            ..World::default()
        };
        for _ in 0..5 {
            orch.tick_frame(&frame(1.0, Some(player(1, true))), &mut world);
        }
        let outcome = orch.override_multiplier(Axis::AttackSpeed, 2.5, &mut world);
        assert_eq!(
            outcome,
            OverrideOutcome::Applied {
                stored: 2.5,
                entities: 2
            }
        );
        // The controller follows the override before the next step.
        let state = orch.axis_state(Axis::AttackSpeed);
        assert_eq!(state.resyncs, 1);
        assert!((state.multiplier - 2.5).abs() < 1e-12);
        assert!((state.theta - 2.5_f64.ln()).abs() < 1e-12);
        assert_eq!(state.velocity, 0.0);
        assert_eq!(orch.metrics().snapshot().resyncs, 1);

        orch.tick_frame(&frame(1.0, Some(player(1, true))), &mut world);
        let state = orch.axis_state(Axis::AttackSpeed);
        assert_eq!(state.resyncs, 1);
        assert_eq!(orch.metrics().snapshot().resyncs, 1);
        assert!((state.last.challenge01 - challenge_at(2.5)).abs() < 1e-9);

        assert_eq!(
            orch.override_multiplier(Axis::AttackSpeed, f64::INFINITY, &mut world),
            OverrideOutcome::Rejected
        );
    }

    fn challenge_at(m: f64) -> f64 {
        let (lo, hi) = GeneLimits::default().theta_bounds();
        (m.ln() - lo) / (hi - lo)
    }

    #[test]
    fn disabled_axes_do_not_move() {
        let mut config = DdaConfig::adaptive();
        config.step_interval_seconds = 1.0;
        let mut orch = DecisionOrchestrator::new(config);
        orch.set_axis_enabled(Axis::MoveSpeed, false);
        let mut world = World::default();
        for _ in 0..30 {
            orch.tick_frame(&frame(1.0, Some(player(1, true))), &mut world);
        }
        assert_eq!(orch.multiplier(Axis::MoveSpeed), 1.0);
        assert_eq!(orch.axis_state(Axis::MoveSpeed).steps_done, 0);
        assert_eq!(orch.axis_state(Axis::MaxHealth).steps_done, 30);
        assert!(!orch.config().axes.move_speed);
    }

    #[test]
    fn all_axes_disabled_consumes_steps_without_work() {
        let mut config = DdaConfig::adaptive();
        config.axes = crate::config::AxisToggles::all(false);
        let mut orch = DecisionOrchestrator::new(config);
        let mut world = World::default();
        let report = orch.tick_frame(&frame(30.0, Some(player(1, true))), &mut world);
        assert_eq!(report.step.due_steps, 3);
        assert_eq!(report.step.executed_steps, 0);
        assert_eq!(orch.metrics().snapshot().skipped_steps, 3);
    }

    #[test]
    fn mode_switch_resets_but_keeps_actuators() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        orch.tick_frame(&frame(5.0, Some(player(1, true))), &mut world);
        orch.override_multiplier(Axis::AttackDamage, 0.5, &mut world);

        assert!(!orch.set_mode(ControlMode::Adaptive));
        assert!(orch.set_mode(ControlMode::Observe));
        assert!(orch.tracked_player().is_none());
        assert_eq!(orch.step_clock().accumulated_seconds(), 0.0);
        assert_eq!(orch.multiplier(Axis::AttackDamage), 0.5);

        let report = orch.tick_frame(&frame(30.0, Some(player(1, true))), &mut world);
        assert_eq!(report.step.skipped, Some(SkipReason::NotAdaptive));
        assert!(orch.latest_sample().is_some());

        assert_eq!(orch.reset_actuators(&mut world), 0);
        assert!(orch.actuators().is_neutral());
    }

    #[test]
    fn invalid_frame_dt_is_dropped() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        for dt in [f64::NAN, -1.0, 0.0, f64::INFINITY] {
            orch.tick_frame(&frame(dt, Some(player(1, true))), &mut world);
        }
        assert!(orch.tracked_player().is_none());
        assert_eq!(orch.metrics().snapshot().dropped_inputs, 4);
    }

    #[test]
    fn player_loss_with_invalid_dt_still_resets() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        orch.tick_frame(&frame(5.0, Some(player(1, true))), &mut world);
        assert_eq!(orch.tracked_player(), Some(1));

        let report = orch.tick_frame(&frame(f64::NAN, None), &mut world);
        assert_eq!(report.reset, Some(ResetCause::PlayerLost));
        assert_eq!(report.tracked, None);
        assert!(orch.tracked_player().is_none());
        assert!(orch.latest_sample().is_none());
        assert_eq!(orch.step_clock().accumulated_seconds(), 0.0);
        let metrics = orch.metrics().snapshot();
        assert_eq!(metrics.resets, 1);
        assert_eq!(metrics.dropped_inputs, 0);
    }

    #[test]
    fn skill_weight_swap_applies_to_one_axis() {
        let mut config = DdaConfig::adaptive();
        config.step_interval_seconds = 1.0;
        let mut orch = DecisionOrchestrator::new(config);
        let mut world = World::default();
        for _ in 0..3 {
            orch.tick_frame(&frame(1.0, Some(player(1, true))), &mut world);
        }
        // No outgoing damage yet: kill speed is neutral and safety is full.
        assert!(orch.axis_state(Axis::MaxHealth).last.skill01 > 0.3);

        let only_outgoing = SkillWeights {
            outgoing_damage: 1.0,
            ..SkillWeights::default()
        };
        orch.set_skill_weights(Axis::MaxHealth, only_outgoing);
        assert_eq!(*orch.config().skill.get(Axis::MaxHealth), only_outgoing);

        let report = orch.tick_frame(&frame(1.0, Some(player(1, true))), &mut world);
        assert_eq!(report.step.executed_steps, 1);
        let sample = orch.latest_sample().expect("sample");
        assert_eq!(sample.outgoing_damage_norm01, 0.0);
        assert_eq!(orch.axis_state(Axis::MaxHealth).last.skill01, 0.0);

        for axis in [Axis::MoveSpeed, Axis::AttackSpeed, Axis::AttackDamage] {
            let expected = SkillWeights::for_axis(axis).estimate(&sample);
            let got = orch.axis_state(axis).last.skill01;
            assert!((got - expected).abs() < 1e-12, "{axis}: {got} vs {expected}");
        }
    }

    #[test]
    fn sensor_reconfigure_takes_effect_next_frame() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        orch.tick_frame(&frame(0.1, Some(player(1, true))), &mut world);
        let hit = DamageEvent {
            attacker: Some(EntityRef::opponent(9)),
            victim: EntityRef::player(1),
            amount: 6.0,
            dt: 0.5,
        };
        for _ in 0..4 {
            assert_eq!(orch.on_damage(&hit), DamageRoute::Incoming);
        }
        orch.tick_frame(&frame(0.1, Some(player(1, true))), &mut world);
        let before = orch.latest_sample().expect("sample").hit_rate_norm01;
        assert!(before > 0.0);

        let sensors = SensorConfig {
            tau_seconds: 4.0,
            ..orch.config().sensors
        };
        let targets = NormTargets {
            hits_per_second: 100.0,
            ..orch.config().normalization
        };
        orch.set_sensor_config(sensors, targets);
        assert_eq!(orch.config().normalization.hits_per_second, 100.0);
        assert_eq!(orch.config().sensors.tau_seconds, 4.0);
        assert_eq!(orch.sampler().targets().hits_per_second, 100.0);
        assert_eq!(orch.power.tau_seconds(), 4.0);

        orch.tick_frame(&frame(0.1, Some(player(1, true))), &mut world);
        let after = orch.latest_sample().expect("sample");
        assert!(after.hit_rate_norm01 < before, "{} vs {before}", after.hit_rate_norm01);
        let expected = crate::numeric::norm01(after.hit_rate_on_target, 100.0);
        assert!((after.hit_rate_norm01 - expected).abs() < 1e-12);

        // Invalid values fall back through sanitization.
        orch.set_sensor_config(
            SensorConfig {
                tau_seconds: f64::NAN,
                ..sensors
            },
            NormTargets {
                hits_per_second: -1.0,
                ..targets
            },
        );
        assert!(orch.config().sensors.tau_seconds.is_finite());
        assert_eq!(
            orch.config().normalization.hits_per_second,
            NormTargets::default().hits_per_second
        );
        assert_eq!(orch.power.tau_seconds(), orch.config().sensors.tau_seconds);
    }

    #[test]
    fn command_setters_clamp() {
        let mut orch = DecisionOrchestrator::default();
        assert_eq!(orch.set_step_interval(0.0), 1.0);
        assert_eq!(orch.set_step_interval(1e6), 300.0);
        let limits = orch.set_limits(GeneLimits {
            floor: 3.0,
            cap: 0.5,
        });
        assert_eq!((limits.floor, limits.cap), (0.5, 3.0));
        orch.set_tuning(
            Axis::MaxHealth,
            AxisTuning {
                learning_rate: 0.1,
                max_delta_theta: 0.02,
            },
        );
        assert_eq!(orch.config().tuning.max_health.learning_rate, 0.1);
    }

    #[test]
    fn snapshot_text_lists_every_axis() {
        let mut orch = DecisionOrchestrator::new(DdaConfig::adaptive());
        let mut world = World::default();
        orch.tick_frame(&frame(0.5, Some(player(7, true))), &mut world);
        let snap = orch.snapshot();
        assert_eq!(snap.axes.len(), Axis::COUNT);
        let text = snap.render_text();
        assert!(text.contains("player 7"));
        for axis in Axis::ALL {
            assert!(text.contains(axis.short_label()));
        }
        let json = serde_json::to_value(&snap).expect("serialize");
        assert_eq!(json["mode"], "adaptive");
        assert_eq!(json["axes"][0]["axis"], "max_health");
    }
}
