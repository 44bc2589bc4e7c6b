//! Harness error type.

use egoviz_core::EgoVizError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Loading, parsing or committing playback data failed
    #[error(transparent)]
    Core(#[from] EgoVizError),

    /// Writing an export or mock asset failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid command-line or run configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
