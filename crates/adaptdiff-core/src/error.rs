//! Error types for configuration loading.
//!
//! The control path itself never fails: invalid numeric input is discarded in
//! place. Only reading configuration from files or JSON can surface an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: f64) -> Self {
        Self::InvalidValue {
            field,
            value: value.to_string(),
        }
    }
}
