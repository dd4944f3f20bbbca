//! Deterministic scenario replay.
//!
//! A scenario is a JSON document of frames. Each frame carries a tick length,
//! the tracked player (or none), operator commands and combat events. Within a
//! frame the runner applies commands first, then ticks the orchestrator, then
//! feeds events. The world is an in-memory [`SimWorld`] that applies
//! multipliers through stat tokens.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use adaptdiff_core::orchestrator::{FrameReport, OverrideOutcome, ResetCause};
use adaptdiff_core::tokens::{TokenInventory, TokenKind, TokenPlan, apply_tokens};
use adaptdiff_core::{
    Axis, CombatEvent, ControlMode, DdaConfig, DecisionOrchestrator, EntityId, FrameInput,
    GeneLimits, HostWorld, MetricsSnapshot, NormTargets, SensorConfig, Side, SkillWeights,
    TrackedPlayer,
};

use crate::HarnessError;
use crate::structured_log::{LogEmitter, LogLevel, Outcome};

// ---------------------------------------------------------------------------
// Scenario file format
// ---------------------------------------------------------------------------

/// Operator command issued at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ScenarioCommand {
    SetMode { mode: ControlMode },
    SetStepInterval { seconds: f64 },
    SetAxisEnabled { axis: Axis, enabled: bool },
    SetLimits { floor: f64, cap: f64 },
    OverrideMultiplier { axis: Axis, value: f64 },
    SetSkillWeights { axis: Axis, weights: SkillWeights },
    SetSensorConfig {
        #[serde(default)]
        sensors: SensorConfig,
        #[serde(default)]
        normalization: NormTargets,
    },
    Reset,
    ResetActuators,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFrame {
    pub dt: f64,
    #[serde(default)]
    pub player: Option<TrackedPlayer>,
    #[serde(default)]
    pub commands: Vec<ScenarioCommand>,
    #[serde(default)]
    pub events: Vec<CombatEvent>,
    /// Replay this frame (commands and events included) this many times.
    #[serde(default = "one")]
    pub repeat: u32,
}

impl ScenarioFrame {
    #[must_use]
    pub fn new(dt: f64, player: Option<TrackedPlayer>) -> Self {
        Self {
            dt,
            player,
            commands: Vec::new(),
            events: Vec::new(),
            repeat: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Defaults to [`DdaConfig::adaptive`] when absent.
    #[serde(default)]
    pub config: Option<DdaConfig>,
    /// Opponents alive before the first frame.
    #[serde(default)]
    pub opponents: Vec<EntityId>,
    pub frames: Vec<ScenarioFrame>,
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, HarnessError> {
        let scenario: Self = serde_json::from_str(json)?;
        if scenario.frames.is_empty() {
            return Err(HarnessError::EmptyScenario(scenario.name));
        }
        if let Some(config) = &scenario.config {
            config.validate()?;
        }
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let json = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Total frames after expanding `repeat`.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.repeat)).sum()
    }
}

// ---------------------------------------------------------------------------
// Simulated world
// ---------------------------------------------------------------------------

/// In-memory host. Multipliers arrive through [`HostWorld`] and are stored
/// as exact stat-token counts.
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    opponents: BTreeSet<EntityId>,
    multipliers: HashMap<(EntityId, Axis), f64>,
    tokens: HashMap<(EntityId, Axis, TokenKind), u32>,
    token_writes: u64,
}

impl SimWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: EntityId) -> bool {
        self.opponents.insert(entity)
    }

    /// Remove an opponent and everything stored for it.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        self.multipliers.retain(|(id, _), _| *id != entity);
        self.tokens.retain(|(id, _, _), _| *id != entity);
        self.opponents.remove(&entity)
    }

    #[must_use]
    pub fn opponents(&self) -> Vec<EntityId> {
        self.opponents.iter().copied().collect()
    }

    /// Last multiplier pushed for `(entity, axis)`.
    #[must_use]
    pub fn applied_multiplier(&self, entity: EntityId, axis: Axis) -> Option<f64> {
        self.multipliers.get(&(entity, axis)).copied()
    }

    /// Multiplier implied by the entity's token counts.
    #[must_use]
    pub fn effective_multiplier(&self, entity: EntityId, axis: Axis) -> f64 {
        TokenPlan {
            axis,
            boost: self.token_count(entity, axis, TokenKind::Boost),
            penalty: self.token_count(entity, axis, TokenKind::Penalty),
        }
        .effective_multiplier()
    }

    #[must_use]
    pub fn token_writes(&self) -> u64 {
        self.token_writes
    }
}

impl HostWorld for SimWorld {
    fn live_opponents(&self) -> Vec<EntityId> {
        self.opponents()
    }

    fn apply_multiplier(&mut self, entity: EntityId, axis: Axis, value: f64) {
        if !self.opponents.contains(&entity) {
            return;
        }
        self.multipliers.insert((entity, axis), value);
        apply_tokens(self, entity, &TokenPlan::for_multiplier(axis, value));
    }
}

impl TokenInventory for SimWorld {
    fn token_count(&self, entity: EntityId, axis: Axis, kind: TokenKind) -> u32 {
        self.tokens.get(&(entity, axis, kind)).copied().unwrap_or(0)
    }

    fn set_token_count(&mut self, entity: EntityId, axis: Axis, kind: TokenKind, count: u32) {
        self.token_writes += 1;
        if count == 0 {
            self.tokens.remove(&(entity, axis, kind));
        } else {
            self.tokens.insert((entity, axis, kind), count);
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// One frame in which at least one decision step came due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub frame: u64,
    pub sim_time: f64,
    pub due_steps: u32,
    pub executed_steps: u32,
    pub changed_axes: Vec<Axis>,
    pub multipliers: [f64; Axis::COUNT],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub name: String,
    pub mode: ControlMode,
    pub frames: u64,
    pub sim_seconds: f64,
    pub tracked_player: Option<EntityId>,
    pub decision_steps: u64,
    pub applications: u64,
    pub entities_updated: u64,
    pub token_writes: u64,
    pub final_multipliers: BTreeMap<Axis, f64>,
    pub metrics: MetricsSnapshot,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    #[must_use]
    pub fn multiplier(&self, axis: Axis) -> f64 {
        self.final_multipliers.get(&axis).copied().unwrap_or(1.0)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Drives one orchestrator through frames against a [`SimWorld`].
pub struct ScenarioRunner {
    name: String,
    orchestrator: DecisionOrchestrator,
    world: SimWorld,
    frames: u64,
    sim_time: f64,
    steps: Vec<StepRecord>,
    log: Option<LogEmitter>,
}

impl ScenarioRunner {
    #[must_use]
    pub fn new(name: impl Into<String>, config: DdaConfig) -> Self {
        Self {
            name: name.into(),
            orchestrator: DecisionOrchestrator::new(config),
            world: SimWorld::new(),
            frames: 0,
            sim_time: 0.0,
            steps: Vec::new(),
            log: None,
        }
    }

    /// Runner primed with the scenario's config and initial opponents.
    #[must_use]
    pub fn for_scenario(scenario: &Scenario) -> Self {
        let config = scenario.config.clone().unwrap_or_else(DdaConfig::adaptive);
        let mut runner = Self::new(scenario.name.clone(), config);
        for &id in &scenario.opponents {
            runner.world.spawn(id);
        }
        runner
    }

    /// Attach a structured log and emit the `run_start` record.
    pub fn with_log(mut self, mut emitter: LogEmitter) -> Result<Self, HarnessError> {
        let config = serde_json::to_value(self.orchestrator.config())?;
        let entry = emitter
            .entry(LogLevel::Info, "run_start")
            .with_mode(self.orchestrator.mode().as_str())
            .with_sim_time(self.sim_time)
            .with_details(serde_json::json!({
                "scenario": self.name,
                "opponents": self.world.opponents(),
                "config": config,
            }));
        emitter.emit_entry(entry)?;
        self.log = Some(emitter);
        Ok(self)
    }

    #[must_use]
    pub fn orchestrator(&self) -> &DecisionOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SimWorld {
        &mut self.world
    }

    #[must_use]
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Replay a whole scenario and return the report with the log, if any.
    pub fn run(
        scenario: &Scenario,
        log: Option<LogEmitter>,
    ) -> Result<(RunReport, Option<LogEmitter>), HarnessError> {
        if scenario.frames.is_empty() {
            return Err(HarnessError::EmptyScenario(scenario.name.clone()));
        }
        let mut runner = Self::for_scenario(scenario);
        if let Some(emitter) = log {
            runner = runner.with_log(emitter)?;
        }
        for frame in &scenario.frames {
            for _ in 0..frame.repeat {
                runner.run_frame(frame)?;
            }
        }
        runner.finish()
    }

    /// Commands, then the tick, then events.
    pub fn run_frame(&mut self, frame: &ScenarioFrame) -> Result<FrameReport, HarnessError> {
        for command in &frame.commands {
            self.apply_command(*command)?;
        }

        let report = self.orchestrator.tick_frame(
            &FrameInput {
                dt: frame.dt,
                player: frame.player,
            },
            &mut self.world,
        );
        self.frames += 1;
        if frame.dt.is_finite() && frame.dt > 0.0 {
            self.sim_time += frame.dt;
        }

        if let Some(cause) = report.reset {
            self.log_reset(cause)?;
        }
        if report.step.due_steps > 0 {
            self.record_step(&report)?;
        }

        for event in &frame.events {
            self.feed_event(event);
        }
        Ok(report)
    }

    fn feed_event(&mut self, event: &CombatEvent) {
        match event {
            CombatEvent::Spawned { entity } if entity.side == Side::Opponent => {
                self.world.spawn(entity.id);
                self.orchestrator.handle_event(event, &mut self.world);
            }
            CombatEvent::Defeated { victim } if victim.side == Side::Opponent => {
                self.orchestrator.handle_event(event, &mut self.world);
                self.world.despawn(victim.id);
            }
            _ => self.orchestrator.handle_event(event, &mut self.world),
        }
    }

    /// Apply one operator command. Returns false when it was rejected or a
    /// no-op.
    pub fn apply_command(&mut self, command: ScenarioCommand) -> Result<bool, HarnessError> {
        let (accepted, details) = match command {
            ScenarioCommand::SetMode { mode } => {
                let changed = self.orchestrator.set_mode(mode);
                (changed, serde_json::json!({ "mode": mode.as_str() }))
            }
            ScenarioCommand::SetStepInterval { seconds } => {
                let effective = self.orchestrator.set_step_interval(seconds);
                (
                    true,
                    serde_json::json!({ "requested": seconds, "effective": effective }),
                )
            }
            ScenarioCommand::SetAxisEnabled { axis, enabled } => {
                self.orchestrator.set_axis_enabled(axis, enabled);
                (true, serde_json::json!({ "axis": axis, "enabled": enabled }))
            }
            ScenarioCommand::SetLimits { floor, cap } => {
                let limits = self
                    .orchestrator
                    .set_limits(GeneLimits { floor, cap });
                (
                    true,
                    serde_json::json!({ "floor": limits.floor, "cap": limits.cap }),
                )
            }
            ScenarioCommand::OverrideMultiplier { axis, value } => {
                let outcome = self
                    .orchestrator
                    .override_multiplier(axis, value, &mut self.world);
                (
                    outcome != OverrideOutcome::Rejected,
                    serde_json::json!({ "axis": axis, "result": outcome }),
                )
            }
            ScenarioCommand::SetSkillWeights { axis, weights } => {
                self.orchestrator.set_skill_weights(axis, weights);
                (true, serde_json::json!({ "axis": axis, "weights": weights }))
            }
            ScenarioCommand::SetSensorConfig {
                sensors,
                normalization,
            } => {
                self.orchestrator.set_sensor_config(sensors, normalization);
                let config = self.orchestrator.config();
                (
                    true,
                    serde_json::json!({
                        "sensors": config.sensors,
                        "normalization": config.normalization,
                    }),
                )
            }
            ScenarioCommand::Reset => {
                self.orchestrator.reset();
                (true, serde_json::Value::Null)
            }
            ScenarioCommand::ResetActuators => {
                let entities = self.orchestrator.reset_actuators(&mut self.world);
                (true, serde_json::json!({ "entities": entities }))
            }
        };

        if let Some(log) = self.log.as_mut() {
            let entry = log
                .entry(LogLevel::Info, "command")
                .with_mode(self.orchestrator.mode().as_str())
                .with_sim_time(self.sim_time)
                .with_outcome(if accepted {
                    Outcome::Pass
                } else {
                    Outcome::Rejected
                })
                .with_details(serde_json::json!({
                    "command": serde_json::to_value(command)?,
                    "effect": details,
                }));
            log.emit_entry(entry)?;
        }
        Ok(accepted)
    }

    fn log_reset(&mut self, cause: ResetCause) -> Result<(), HarnessError> {
        let Some(log) = self.log.as_mut() else {
            return Ok(());
        };
        let entry = log
            .entry(LogLevel::Info, "session_reset")
            .with_mode(self.orchestrator.mode().as_str())
            .with_sim_time(self.sim_time)
            .with_details(serde_json::json!({ "cause": cause }));
        log.emit_entry(entry)?;
        Ok(())
    }

    fn record_step(&mut self, report: &FrameReport) -> Result<(), HarnessError> {
        let step = report.step;
        let changed_axes: Vec<Axis> = Axis::ALL
            .into_iter()
            .filter(|axis| step.changed_axes[axis.index()])
            .collect();
        self.steps.push(StepRecord {
            frame: self.frames,
            sim_time: self.sim_time,
            due_steps: step.due_steps,
            executed_steps: step.executed_steps,
            changed_axes: changed_axes.clone(),
            multipliers: self.orchestrator.actuators().all(),
        });

        let Some(log) = self.log.as_mut() else {
            return Ok(());
        };
        let mode = self.orchestrator.mode().as_str();
        let step_no = self.orchestrator.metrics().snapshot().decision_steps;
        let outcome = if step.executed_steps == 0 {
            Outcome::Skipped
        } else if step.changed() {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        };
        let entry = log
            .entry(LogLevel::Info, "decision_step")
            .with_mode(mode)
            .with_sim_time(self.sim_time)
            .with_step(step_no)
            .with_outcome(outcome)
            .with_entities_updated(step.entities_updated as u64)
            .with_details(serde_json::json!({
                "due_steps": step.due_steps,
                "executed_steps": step.executed_steps,
                "applications": step.applications,
                "changed_axes": changed_axes,
                "sensors": self.orchestrator.latest_sample(),
            }));
        log.emit_entry(entry)?;

        for state in self.orchestrator.axis_states() {
            if !state.enabled || step.executed_steps == 0 {
                continue;
            }
            let axis_outcome = if step.changed_axes[state.axis.index()] {
                Outcome::Changed
            } else {
                Outcome::Unchanged
            };
            let entry = log
                .entry(LogLevel::Debug, "axis_step")
                .with_mode(mode)
                .with_sim_time(self.sim_time)
                .with_axis(state.axis.as_str())
                .with_step(step_no)
                .with_outcome(axis_outcome)
                .with_details(serde_json::to_value(state)?);
            log.emit_entry(entry)?;
        }
        Ok(())
    }

    /// Emit `run_end`, flush the log and build the report.
    pub fn finish(mut self) -> Result<(RunReport, Option<LogEmitter>), HarnessError> {
        let metrics = self.orchestrator.metrics().snapshot();
        let report = RunReport {
            name: self.name.clone(),
            mode: self.orchestrator.mode(),
            frames: self.frames,
            sim_seconds: self.sim_time,
            tracked_player: self.orchestrator.tracked_player(),
            decision_steps: metrics.decision_steps,
            applications: metrics.applications,
            entities_updated: metrics.entities_updated,
            token_writes: self.world.token_writes(),
            final_multipliers: Axis::ALL
                .into_iter()
                .map(|axis| (axis, self.orchestrator.multiplier(axis)))
                .collect(),
            metrics,
            steps: std::mem::take(&mut self.steps),
        };

        if let Some(log) = self.log.as_mut() {
            let entry = log
                .entry(LogLevel::Info, "run_end")
                .with_mode(report.mode.as_str())
                .with_sim_time(report.sim_seconds)
                .with_step(report.decision_steps)
                .with_outcome(Outcome::Pass)
                .with_details(serde_json::json!({
                    "frames": report.frames,
                    "final_multipliers": report.final_multipliers,
                    "metrics": report.metrics,
                }));
            log.emit_entry(entry)?;
            log.flush()?;
        }
        Ok((report, self.log))
    }
}
