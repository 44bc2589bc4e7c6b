//! Error types for the EgoViz host capability layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the host environment.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Asset does not exist
    #[error("Asset not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Asset exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Asset bytes are not valid UTF-8 text
    #[error("Asset is not valid UTF-8: {}", .0.display())]
    NotText(PathBuf),

    /// The host rejected a scene operation
    #[error("Host error: {0}")]
    Host(String),
}

impl EnvError {
    /// Maps an I/O error for `path`, folding `NotFound` into its own variant.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Unreadable { path, source }
        }
    }

    /// Creates a host error.
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }
}
