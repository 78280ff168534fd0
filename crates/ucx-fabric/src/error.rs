//! Error types for fabric interface discovery.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use ucx_uct::UctError;

/// Result type alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors that abort a discovery call or its setup.
///
/// Failures below the component list never surface here; they are logged
/// and the walk moves on to the next sibling.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The transport library could not be opened or enumerated.
    #[error(transparent)]
    Uct(#[from] UctError),

    /// The caller cancelled the discovery.
    #[error("fabric interface discovery cancelled")]
    Cancelled,

    /// Failed to read a configuration file.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Configuration validation error.
    #[error("invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },
}

impl DiscoveryError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if the transport library itself was unusable.
    pub fn is_library_unavailable(&self) -> bool {
        matches!(self, DiscoveryError::Uct(e) if e.is_library_unavailable())
    }
}
