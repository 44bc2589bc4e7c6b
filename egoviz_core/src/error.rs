//! Error types for terrain and trajectory loading.

use std::path::PathBuf;

use egoviz_env::EnvError;
use thiserror::Error;

/// Errors surfaced by the EgoViz core.
///
/// Nothing in the core panics on bad input; every failure comes back as one
/// of these, and the caller decides whether to log and continue.
#[derive(Debug, Error)]
pub enum EgoVizError {
    /// Asset absent or unreadable. The operation is aborted and any state
    /// the caller already holds is left untouched.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: EnvError,
    },

    /// Input violates its declared schema
    #[error("Format error: {0}")]
    Format(String),

    /// The scene host refused a mesh or placement
    #[error("Host rejected request: {0}")]
    Host(#[source] EnvError),
}

impl EgoVizError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: EnvError) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

impl From<csv::Error> for EgoVizError {
    fn from(e: csv::Error) -> Self {
        Self::Format(e.to_string())
    }
}

impl From<serde_json::Error> for EgoVizError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EgoVizError>;
