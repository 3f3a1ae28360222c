//! Error types for regtune

use thiserror::Error;

/// Result type alias for regtune operations
pub type Result<T> = std::result::Result<T, RegTuneError>;

#[derive(Error, Debug)]
pub enum RegTuneError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Unknown category '{label}' in column '{column}'")]
    UnknownCategory { column: String, label: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Dataset has no target column")]
    MissingTarget,

    #[error("Training error: {0}")]
    Training(String),

    #[error("Search cancelled before any round completed")]
    Cancelled,

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RegTuneError {
    fn from(err: serde_json::Error) -> Self {
        RegTuneError::Serialization(err.to_string())
    }
}

impl RegTuneError {
    pub(crate) fn invalid(name: &str, value: impl std::fmt::Display, reason: &str) -> Self {
        RegTuneError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
