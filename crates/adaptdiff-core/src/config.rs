//! Controller configuration.
//!
//! Configuration is plain data: a [`DdaConfig`] can be built in code, loaded
//! from JSON, and patched from environment variables:
//! - `ADAPTDIFF_MODE`: `off`, `observe` or `adaptive` (default `off`).
//! - `ADAPTDIFF_STEP_SECONDS`: active seconds between decision steps.
//! - `ADAPTDIFF_GENE_FLOOR` / `ADAPTDIFF_GENE_CAP`: actuator multiplier bounds.
//!
//! Every field is read-mutable at runtime through the orchestrator setters;
//! nothing here is sampled only at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::decision::axis_controller::AxisTuningTable;
use crate::decision::skill::SkillModel;
use crate::decision::step_clock::{DEFAULT_STEP_SECONDS, MAX_STEP_SECONDS, MIN_STEP_SECONDS};
use crate::error::ConfigError;
use crate::numeric::{MIN_LOG_ARGUMENT, is_positive_finite};
use crate::telemetry::{NormTargets, SensorConfig};

pub const ENV_MODE: &str = "ADAPTDIFF_MODE";
pub const ENV_STEP_SECONDS: &str = "ADAPTDIFF_STEP_SECONDS";
pub const ENV_GENE_FLOOR: &str = "ADAPTDIFF_GENE_FLOOR";
pub const ENV_GENE_CAP: &str = "ADAPTDIFF_GENE_CAP";

/// Operating mode of the controller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// No work at all. Events and frames are ignored.
    #[default]
    Off,
    /// Sensors and power are tracked for debug surfaces; actuators never move.
    Observe,
    /// Full control loop: sensors, decision steps, and world application.
    Adaptive,
}

impl ControlMode {
    /// Parse from string (case-insensitive). Unknown input maps to `Off`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "adaptive" | "sgd" | "on" | "active" => Self::Adaptive,
            "observe" | "observe-only" | "overlay" | "debug" => Self::Observe,
            _ => Self::Off,
        }
    }

    /// Returns true if sensors and power estimation run.
    #[must_use]
    pub const fn tracks_player(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Returns true if decision steps may move actuators.
    #[must_use]
    pub const fn adapts(self) -> bool {
        matches!(self, Self::Adaptive)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Observe => "observe",
            Self::Adaptive => "adaptive",
        }
    }
}

/// Shared `[floor, cap]` range for every actuator multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneLimits {
    pub floor: f64,
    pub cap: f64,
}

impl GeneLimits {
    pub const DEFAULT_FLOOR: f64 = 0.01;
    pub const DEFAULT_CAP: f64 = 10.0;

    /// Build sanitized limits from arbitrary bounds.
    #[must_use]
    pub fn new(floor: f64, cap: f64) -> Self {
        Self { floor, cap }.sanitized()
    }

    /// Swap inverted bounds and keep both strictly positive so `ln(floor)`
    /// is finite. Non-finite bounds fall back to the defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let mut floor = if self.floor.is_finite() {
            self.floor
        } else {
            Self::DEFAULT_FLOOR
        };
        let mut cap = if self.cap.is_finite() {
            self.cap
        } else {
            Self::DEFAULT_CAP
        };
        if cap < floor {
            std::mem::swap(&mut floor, &mut cap);
        }
        let floor = floor.max(MIN_LOG_ARGUMENT);
        let cap = cap.max(floor);
        Self { floor, cap }
    }

    /// Clamp a multiplier into the range. Callers must reject non-finite input first.
    #[inline]
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        let limits = self.sanitized();
        value.clamp(limits.floor, limits.cap)
    }

    /// Log-space bounds `(ln floor, ln cap)`.
    #[must_use]
    pub fn theta_bounds(self) -> (f64, f64) {
        let limits = self.sanitized();
        (limits.floor.ln(), limits.cap.ln())
    }

    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        let limits = self.sanitized();
        value.is_finite() && value >= limits.floor && value <= limits.cap
    }
}

impl Default for GeneLimits {
    fn default() -> Self {
        Self {
            floor: Self::DEFAULT_FLOOR,
            cap: Self::DEFAULT_CAP,
        }
    }
}

/// Per-axis adaptation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisToggles {
    pub max_health: bool,
    pub move_speed: bool,
    pub attack_speed: bool,
    pub attack_damage: bool,
}

impl AxisToggles {
    #[must_use]
    pub const fn all(enabled: bool) -> Self {
        Self {
            max_health: enabled,
            move_speed: enabled,
            attack_speed: enabled,
            attack_damage: enabled,
        }
    }

    #[must_use]
    pub const fn get(&self, axis: Axis) -> bool {
        match axis {
            Axis::MaxHealth => self.max_health,
            Axis::MoveSpeed => self.move_speed,
            Axis::AttackSpeed => self.attack_speed,
            Axis::AttackDamage => self.attack_damage,
        }
    }

    pub fn set(&mut self, axis: Axis, enabled: bool) {
        match axis {
            Axis::MaxHealth => self.max_health = enabled,
            Axis::MoveSpeed => self.move_speed = enabled,
            Axis::AttackSpeed => self.attack_speed = enabled,
            Axis::AttackDamage => self.attack_damage = enabled,
        }
    }

    #[must_use]
    pub const fn any(&self) -> bool {
        self.max_health || self.move_speed || self.attack_speed || self.attack_damage
    }
}

impl Default for AxisToggles {
    fn default() -> Self {
        Self::all(true)
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdaConfig {
    pub mode: ControlMode,
    pub limits: GeneLimits,
    pub step_interval_seconds: f64,
    pub axes: AxisToggles,
    pub sensors: SensorConfig,
    pub normalization: NormTargets,
    pub tuning: AxisTuningTable,
    pub skill: SkillModel,
}

impl Default for DdaConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::default(),
            limits: GeneLimits::default(),
            step_interval_seconds: DEFAULT_STEP_SECONDS,
            axes: AxisToggles::default(),
            sensors: SensorConfig::default(),
            normalization: NormTargets::default(),
            tuning: AxisTuningTable::default(),
            skill: SkillModel::default(),
        }
    }
}

impl DdaConfig {
    /// Default configuration with the control loop switched on.
    #[must_use]
    pub fn adaptive() -> Self {
        Self {
            mode: ControlMode::Adaptive,
            ..Self::default()
        }
    }

    /// Parse, validate and sanitize a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config.sanitized())
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values that cannot be meaningfully repaired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.limits.floor.is_finite() || self.limits.floor <= 0.0 {
            return Err(ConfigError::invalid("limits.floor", self.limits.floor));
        }
        if !self.limits.cap.is_finite() || self.limits.cap <= 0.0 {
            return Err(ConfigError::invalid("limits.cap", self.limits.cap));
        }
        if !is_positive_finite(self.step_interval_seconds) {
            return Err(ConfigError::invalid(
                "step_interval_seconds",
                self.step_interval_seconds,
            ));
        }
        if !is_positive_finite(self.sensors.tau_seconds) {
            return Err(ConfigError::invalid(
                "sensors.tau_seconds",
                self.sensors.tau_seconds,
            ));
        }
        if !is_positive_finite(self.sensors.window_seconds) {
            return Err(ConfigError::invalid(
                "sensors.window_seconds",
                self.sensors.window_seconds,
            ));
        }
        for axis in Axis::ALL {
            let tuning = self.tuning.get(axis);
            if !tuning.learning_rate.is_finite() || tuning.learning_rate < 0.0 {
                return Err(ConfigError::invalid(
                    "tuning.learning_rate",
                    tuning.learning_rate,
                ));
            }
            if !is_positive_finite(tuning.max_delta_theta) {
                return Err(ConfigError::invalid(
                    "tuning.max_delta_theta",
                    tuning.max_delta_theta,
                ));
            }
        }
        Ok(())
    }

    /// Clamp every field into its supported range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.limits = self.limits.sanitized();
        self.step_interval_seconds = sanitize_step_seconds(self.step_interval_seconds);
        self.sensors = self.sensors.sanitized();
        self.normalization = self.normalization.sanitized();
        for axis in Axis::ALL {
            let tuning = self.tuning.get(axis).sanitized(axis);
            self.tuning.set(axis, tuning);
        }
        self
    }

    /// Patch the configuration from `ADAPTDIFF_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Patch from an arbitrary key lookup. Unparseable values are ignored and
    /// the previous setting stays in place.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MODE) {
            self.mode = ControlMode::from_str_loose(&raw);
        }
        if let Some(seconds) = lookup(ENV_STEP_SECONDS).and_then(|raw| parse_number(&raw)) {
            self.step_interval_seconds = sanitize_step_seconds(seconds);
        }
        let floor = lookup(ENV_GENE_FLOOR)
            .and_then(|raw| parse_number(&raw))
            .filter(|v| *v > 0.0);
        let cap = lookup(ENV_GENE_CAP)
            .and_then(|raw| parse_number(&raw))
            .filter(|v| *v > 0.0);
        if floor.is_some() || cap.is_some() {
            self.limits = GeneLimits::new(
                floor.unwrap_or(self.limits.floor),
                cap.unwrap_or(self.limits.cap),
            );
        }
    }
}

/// Clamp a step interval into `[MIN_STEP_SECONDS, MAX_STEP_SECONDS]`.
#[must_use]
pub fn sanitize_step_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.clamp(MIN_STEP_SECONDS, MAX_STEP_SECONDS)
    } else {
        DEFAULT_STEP_SECONDS
    }
}

/// Parse a finite number, accepting a comma decimal separator.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
