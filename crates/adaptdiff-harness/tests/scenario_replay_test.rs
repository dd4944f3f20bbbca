//! Integration test: scenario replay and closed-loop simulation.
//!
//! Validates that:
//! 1. The bundled dominant-duel scenario raises every enabled axis.
//! 2. Disabled axes never step and never appear in the log.
//! 3. Operator commands and player loss show up in both report and log.
//! 4. Replays are deterministic.
//! 5. Synthetic players of different skill end on opposite sides of neutral.
//!
//! Run: cargo test -p adaptdiff-harness --test scenario_replay_test

use adaptdiff_core::{Axis, DdaConfig};
use adaptdiff_harness::scenario::{Scenario, ScenarioRunner};
use adaptdiff_harness::structured_log::{LogEmitter, validate_log_line};
use adaptdiff_harness::synthetic::{SyntheticPlayer, simulate};

const DOMINANT_DUEL: &str = include_str!("../scenarios/dominant_duel.json");
const OPPONENT: u64 = 100;

fn parsed_log(lines: &[String]) -> Vec<serde_json::Value> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if let Err(errors) = validate_log_line(line, i + 1) {
                panic!("invalid log line {}: {errors:?}", i + 1);
            }
            serde_json::from_str(line).expect("valid json")
        })
        .collect()
}

#[test]
fn dominant_duel_raises_enabled_axes() {
    let scenario = Scenario::from_json_str(DOMINANT_DUEL).expect("bundled scenario parses");
    assert_eq!(scenario.frame_count(), 306);

    let emitter = LogEmitter::to_buffer("replay", "duel");
    let (report, log) = ScenarioRunner::run(&scenario, Some(emitter)).expect("replay");

    assert_eq!(report.name, "dominant-duel");
    assert_eq!(report.frames, 306);
    assert!((report.sim_seconds - 30.6).abs() < 1e-6);
    assert!((29..=30).contains(&report.decision_steps), "{}", report.decision_steps);
    assert!(!report.steps.is_empty());
    assert!(report.token_writes > 0);

    for axis in [Axis::MaxHealth, Axis::AttackSpeed] {
        let stored = report.multiplier(axis);
        assert!(stored > 1.0, "{axis}: {stored}");
    }
    assert_eq!(report.multiplier(Axis::MoveSpeed), 1.0);
    assert_eq!(report.multiplier(Axis::AttackDamage), 0.5);
    assert!(report
        .steps
        .iter()
        .all(|step| !step.changed_axes.contains(&Axis::MoveSpeed)));
    let last = report.steps.last().expect("steps recorded");
    assert!(last.multipliers[Axis::AttackDamage.index()] > 1.0);

    // Player loss cleared the session; the override happened before it.
    assert_eq!(report.tracked_player, None);
    assert_eq!(report.metrics.resets, 1);
    assert_eq!(report.metrics.overrides, 1);

    let entries = parsed_log(&log.expect("log returned").buffered_lines());
    assert_eq!(entries.first().map(|e| e["event"].clone()), Some("run_start".into()));
    assert_eq!(entries.last().map(|e| e["event"].clone()), Some("run_end".into()));
    let count = |event: &str| entries.iter().filter(|e| e["event"] == event).count();
    assert_eq!(count("command"), 1);
    assert_eq!(count("session_reset"), 1);
    assert_eq!(count("decision_step") as u64, report.steps.len() as u64);

    let axis_steps: Vec<_> = entries.iter().filter(|e| e["event"] == "axis_step").collect();
    assert!(!axis_steps.is_empty());
    assert!(axis_steps.iter().all(|e| e["axis"] != "move_speed"));
    assert!(axis_steps
        .iter()
        .any(|e| e["axis"] == "max_health" && e["outcome"] == "changed"));
    assert!(axis_steps
        .iter()
        .all(|e| e["controller_id"].as_str().is_some_and(|id| id.starts_with("axis_sgd::"))));
}

#[test]
fn world_tokens_follow_the_director() {
    let scenario = Scenario::from_json_str(DOMINANT_DUEL).expect("bundled scenario parses");
    let mut runner = ScenarioRunner::for_scenario(&scenario);
    for _ in 0..scenario.frames[0].repeat {
        runner.run_frame(&scenario.frames[0]).expect("frame");
    }

    let orch = runner.orchestrator();
    for axis in Axis::ALL {
        let stored = orch.multiplier(axis);
        let effective = runner.world().effective_multiplier(OPPONENT, axis);
        // Tokens are whole percent; sub-threshold moves are not re-applied.
        assert!((effective - stored).abs() < 0.01, "{axis}: {effective} vs {stored}");
    }
    assert_eq!(runner.world().effective_multiplier(OPPONENT, Axis::MoveSpeed), 1.0);
}

#[test]
fn replay_is_deterministic() {
    let scenario = Scenario::from_json_str(DOMINANT_DUEL).expect("bundled scenario parses");
    let (a, _) = ScenarioRunner::run(&scenario, None).expect("first replay");
    let (b, _) = ScenarioRunner::run(&scenario, None).expect("second replay");
    assert_eq!(a, b);
}

#[test]
fn synthetic_skill_orders_the_outcome() {
    let mut config = DdaConfig::adaptive();
    config.step_interval_seconds = 2.0;

    let mut strong = SyntheticPlayer::new(0.9, 11).expect("valid skill");
    let (high, _) = simulate(config.clone(), &mut strong, 240.0, 0.1, None).expect("strong run");
    let mut weak = SyntheticPlayer::new(0.1, 11).expect("valid skill");
    let (low, _) = simulate(config, &mut weak, 240.0, 0.1, None).expect("weak run");

    assert!(high.multiplier(Axis::MaxHealth) > 1.0, "{:?}", high.final_multipliers);
    assert!(low.multiplier(Axis::MaxHealth) < 1.0, "{:?}", low.final_multipliers);
    assert!(strong.kills() > 0);
    assert!(weak.deaths() > 0);

    for report in [&high, &low] {
        assert!((115..=120).contains(&report.decision_steps), "{}", report.decision_steps);
        for axis in Axis::ALL {
            let m = report.multiplier(axis);
            assert!((0.01..=10.0).contains(&m), "{axis}: {m}");
        }
    }
}

#[test]
fn simulation_is_seeded() {
    let run = |seed| {
        let mut player = SyntheticPlayer::new(0.6, seed).expect("valid skill");
        simulate(DdaConfig::adaptive(), &mut player, 60.0, 0.1, None)
            .expect("run")
            .0
    };
    assert_eq!(run(5), run(5));
}
