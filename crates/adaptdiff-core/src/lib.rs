//! Adaptive difficulty director.
//!
//! This crate implements a real-time control loop that observes one player's
//! combat performance and tunes opponent multipliers so that the perceived
//! challenge tracks the player's measured skill.
//!
//! # Architecture
//!
//! - **Telemetry** (`telemetry`): EMA-smoothed, bounded sensor signals from combat events
//! - **Power** (`power`): log-compressed estimate of the player's build strength
//! - **Decision** (`decision`): per-axis momentum-SGD controllers in log-space,
//!   skill weighting, and the fixed-interval step clock
//! - **Actuators** (`actuators`): clamped multiplier store and world application
//! - **Orchestrator** (`orchestrator`): session ownership, event routing, commands
//! - **Shared** (`shared`): mutex-guarded handle for multi-threaded hosts
//! - **Tokens** (`tokens`): integer stat-token encoding for hosts without float modifiers
//! - **Configuration** (`config`): runtime mode, limits and tuning
//! - **Metrics** (`metrics`) and **snapshots** (`snapshot`): observability
//!
//! The control path is total: invalid numeric input is discarded in place and
//! no operation on it returns an error.

#![deny(unsafe_code)]

pub mod actuators;
pub mod axis;
pub mod config;
pub mod decision;
pub mod error;
pub mod events;
pub mod metrics;
pub mod numeric;
pub mod orchestrator;
pub mod power;
pub mod shared;
pub mod snapshot;
pub mod telemetry;
pub mod tokens;

pub use actuators::{ActuatorState, HostWorld};
pub use axis::Axis;
pub use config::{ControlMode, DdaConfig, GeneLimits};
pub use decision::{AxisController, AxisState, SkillModel, SkillWeights, StepClock};
pub use error::ConfigError;
pub use events::{CombatEvent, DamageEvent, DamageRoute, EntityId, EntityRef, Side};
pub use metrics::{DirectorMetrics, MetricsSnapshot};
pub use orchestrator::{
    DecisionOrchestrator, FrameInput, FrameReport, OverrideOutcome, StepOutcome, TrackedPlayer,
};
pub use power::{PowerAttributes, PowerEstimator, PowerSample};
pub use shared::SharedOrchestrator;
pub use snapshot::DirectorSnapshot;
pub use telemetry::{NormTargets, SensorConfig, SensorSample, TelemetrySampler};
