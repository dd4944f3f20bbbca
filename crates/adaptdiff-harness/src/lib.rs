//! Replay and simulation harness for the adaptive difficulty director.
//!
//! This crate provides:
//! - Scenario files: scripted frames, combat events and operator commands
//! - A simulated world that applies multipliers through stat tokens
//! - A synthetic player model for closed-loop runs
//! - Structured JSONL logging with artifact hashing and log validation

#![forbid(unsafe_code)]

pub mod scenario;
pub mod structured_log;
pub mod synthetic;

use std::path::PathBuf;

use adaptdiff_core::ConfigError;

pub use scenario::{
    RunReport, Scenario, ScenarioCommand, ScenarioFrame, ScenarioRunner, SimWorld, StepRecord,
};
pub use structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, LogValidationError, Outcome, validate_log_file,
    validate_log_line,
};
pub use synthetic::{SyntheticPlayer, XorShift64};

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("log write failed: {0}")]
    Log(#[from] std::io::Error),
    #[error("invalid scenario json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("scenario '{0}' has no frames")]
    EmptyScenario(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
