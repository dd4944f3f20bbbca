//! Per-axis momentum-SGD controller operating in log-space.
//!
//! Each axis keeps `theta = ln(multiplier)` and a momentum velocity. One step
//! compares the normalized difficulty position (`challenge01`) against the
//! axis skill estimate (`skill01`) and moves theta against the error:
//!
//! ```text
//! error    = challenge01 - skill01          (0 inside the dead-zone)
//! gradient = clamp(2 * error / range, ±0.5)
//! velocity = clamp(0.65 * velocity + gradient, ±1)
//! delta    = clamp(lr * velocity, ±max_delta)
//! theta'   = clamp(theta - delta, [ln floor, ln cap])
//! ```
//!
//! A fixed theta step is a fixed percentage change of the multiplier, and the
//! multiplier is positive by construction.
//!
//! Before any work the controller syncs with the actuator: the first call
//! seeds theta from the actuator, and later calls detect an external override
//! (drift beyond [`SYNC_EPSILON`]) and re-seed theta with zero momentum.

use serde::{Deserialize, Serialize};

use crate::actuators::ActuatorState;
use crate::axis::Axis;
use crate::decision::skill::SkillWeights;
use crate::numeric::{clamp01, ln_multiplier};
use crate::telemetry::SensorSample;

pub const MOMENTUM: f64 = 0.65;
pub const GRADIENT_CLIP: f64 = 0.50;
pub const VELOCITY_CLIP: f64 = 1.00;
/// Errors smaller than this are treated as zero.
pub const ERROR_DEAD_ZONE: f64 = 0.03;
/// Multiplier drift that counts as an external override.
pub const SYNC_EPSILON: f64 = 0.001;
/// Multiplier movement that counts as a change worth applying.
pub const CHANGE_EPSILON: f64 = 0.0005;

const MIN_THETA_RANGE: f64 = 1e-4;

/// Learning rate and step ceiling for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisTuning {
    pub learning_rate: f64,
    pub max_delta_theta: f64,
}

impl AxisTuning {
    /// Faster-reacting axes get larger steps.
    #[must_use]
    pub const fn for_axis(axis: Axis) -> Self {
        match axis {
            Axis::MaxHealth => Self {
                learning_rate: 0.22,
                max_delta_theta: 0.060,
            },
            Axis::MoveSpeed => Self {
                learning_rate: 0.20,
                max_delta_theta: 0.050,
            },
            Axis::AttackSpeed => Self {
                learning_rate: 0.25,
                max_delta_theta: 0.075,
            },
            Axis::AttackDamage => Self {
                learning_rate: 0.18,
                max_delta_theta: 0.050,
            },
        }
    }

    /// Non-finite or negative values fall back to the axis default.
    #[must_use]
    pub fn sanitized(self, axis: Axis) -> Self {
        let fallback = Self::for_axis(axis);
        Self {
            learning_rate: if self.learning_rate.is_finite() && self.learning_rate >= 0.0 {
                self.learning_rate
            } else {
                fallback.learning_rate
            },
            max_delta_theta: if self.max_delta_theta.is_finite() && self.max_delta_theta > 0.0 {
                self.max_delta_theta
            } else {
                fallback.max_delta_theta
            },
        }
    }
}

/// Tuning for every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisTuningTable {
    pub max_health: AxisTuning,
    pub move_speed: AxisTuning,
    pub attack_speed: AxisTuning,
    pub attack_damage: AxisTuning,
}

impl AxisTuningTable {
    #[must_use]
    pub const fn get(&self, axis: Axis) -> AxisTuning {
        match axis {
            Axis::MaxHealth => self.max_health,
            Axis::MoveSpeed => self.move_speed,
            Axis::AttackSpeed => self.attack_speed,
            Axis::AttackDamage => self.attack_damage,
        }
    }

    pub fn set(&mut self, axis: Axis, tuning: AxisTuning) {
        match axis {
            Axis::MaxHealth => self.max_health = tuning,
            Axis::MoveSpeed => self.move_speed = tuning,
            Axis::AttackSpeed => self.attack_speed = tuning,
            Axis::AttackDamage => self.attack_damage = tuning,
        }
    }
}

impl Default for AxisTuningTable {
    fn default() -> Self {
        Self {
            max_health: AxisTuning::for_axis(Axis::MaxHealth),
            move_speed: AxisTuning::for_axis(Axis::MoveSpeed),
            attack_speed: AxisTuning::for_axis(Axis::AttackSpeed),
            attack_damage: AxisTuning::for_axis(Axis::AttackDamage),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    /// No theta yet; the next sync seeds it from the actuator.
    Uninitialized,
    /// Theta mirrors the actuator. Stepping happens inside `step` and
    /// always returns here.
    Synced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Seeded,
    Resynced,
    InSync,
}

/// Intermediate values of the most recent step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisStepTelemetry {
    pub skill01: f64,
    pub challenge01: f64,
    pub error: f64,
    pub gradient: f64,
    pub delta_theta: f64,
    pub multiplier: f64,
}

/// Read-only view of one controller for debug surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisState {
    pub axis: Axis,
    pub phase: ControllerPhase,
    pub enabled: bool,
    pub theta: f64,
    pub velocity: f64,
    pub multiplier: f64,
    pub last: AxisStepTelemetry,
    pub steps_done: u64,
    pub resyncs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisController {
    axis: Axis,
    tuning: AxisTuning,
    enabled: bool,
    phase: ControllerPhase,
    theta: f64,
    velocity: f64,
    last: AxisStepTelemetry,
    steps_done: u64,
    resyncs: u64,
}

impl AxisController {
    #[must_use]
    pub fn new(axis: Axis, tuning: AxisTuning) -> Self {
        Self {
            axis,
            tuning: tuning.sanitized(axis),
            enabled: true,
            phase: ControllerPhase::Uninitialized,
            theta: 0.0,
            velocity: 0.0,
            last: AxisStepTelemetry::default(),
            steps_done: 0,
            resyncs: 0,
        }
    }

    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[must_use]
    pub fn tuning(&self) -> AxisTuning {
        self.tuning
    }

    pub fn set_tuning(&mut self, tuning: AxisTuning) {
        self.tuning = tuning.sanitized(self.axis);
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    #[must_use]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    #[must_use]
    pub fn last_step(&self) -> AxisStepTelemetry {
        self.last
    }

    #[must_use]
    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }

    #[must_use]
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    #[must_use]
    pub fn state(&self) -> AxisState {
        AxisState {
            axis: self.axis,
            phase: self.phase,
            enabled: self.enabled,
            theta: self.theta,
            velocity: self.velocity,
            multiplier: self.theta.exp(),
            last: self.last,
            steps_done: self.steps_done,
            resyncs: self.resyncs,
        }
    }

    /// Forget theta and momentum. The next sync re-seeds from the actuator.
    pub fn reset(&mut self) {
        self.phase = ControllerPhase::Uninitialized;
        self.theta = 0.0;
        self.velocity = 0.0;
        self.last = AxisStepTelemetry::default();
        self.steps_done = 0;
        self.resyncs = 0;
    }

    /// Seed or re-seed theta from the actuator's current value.
    pub fn sync(&mut self, actuators: &ActuatorState) -> SyncOutcome {
        let (theta_min, theta_max) = actuators.limits().theta_bounds();
        let current = actuators.get(self.axis);
        let seeded = ln_multiplier(current).clamp(theta_min, theta_max);

        match self.phase {
            ControllerPhase::Uninitialized => {
                self.theta = seeded;
                self.velocity = 0.0;
                self.phase = ControllerPhase::Synced;
                SyncOutcome::Seeded
            }
            ControllerPhase::Synced => {
                let drift = (self.theta.exp() - current).abs();
                if !self.theta.is_finite() || !drift.is_finite() || drift > SYNC_EPSILON {
                    self.theta = seeded;
                    self.velocity = 0.0;
                    self.resyncs += 1;
                    SyncOutcome::Resynced
                } else {
                    self.theta = self.theta.clamp(theta_min, theta_max);
                    SyncOutcome::InSync
                }
            }
        }
    }

    /// Normalized difficulty position of the current theta.
    #[must_use]
    pub fn challenge01(&self, actuators: &ActuatorState) -> f64 {
        let (theta_min, theta_max) = actuators.limits().theta_bounds();
        let range = (theta_max - theta_min).max(MIN_THETA_RANGE);
        clamp01((self.theta - theta_min) / range)
    }

    /// One momentum-SGD update. Returns true when the stored multiplier moved
    /// by more than [`CHANGE_EPSILON`].
    pub fn step(
        &mut self,
        sample: &SensorSample,
        weights: &SkillWeights,
        actuators: &mut ActuatorState,
    ) -> bool {
        self.sync(actuators);

        let (theta_min, theta_max) = actuators.limits().theta_bounds();
        let range = (theta_max - theta_min).max(MIN_THETA_RANGE);

        let challenge01 = clamp01((self.theta - theta_min) / range);
        let skill01 = weights.estimate(sample);

        let mut error = challenge01 - skill01;
        if error.abs() < ERROR_DEAD_ZONE {
            error = 0.0;
        }

        let gradient = (2.0 * error / range).clamp(-GRADIENT_CLIP, GRADIENT_CLIP);
        let velocity = (MOMENTUM * self.velocity + gradient).clamp(-VELOCITY_CLIP, VELOCITY_CLIP);
        let delta_theta = (self.tuning.learning_rate * velocity)
            .clamp(-self.tuning.max_delta_theta, self.tuning.max_delta_theta);
        let next_theta = (self.theta - delta_theta).clamp(theta_min, theta_max);

        let before = actuators.get(self.axis);
        let stored = actuators
            .set(self.axis, next_theta.exp())
            .map_or(before, |write| write.stored);
        let changed = (stored - before).abs() > CHANGE_EPSILON;

        self.theta = next_theta;
        self.velocity = velocity;
        self.last = AxisStepTelemetry {
            skill01,
            challenge01,
            error,
            gradient,
            delta_theta,
            multiplier: stored,
        };
        self.steps_done += 1;
        changed
    }
}
