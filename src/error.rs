//! Error types for the relay.

use thiserror::Error;

/// Main error type for relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Snapshot is locked by another process")]
    Locked,
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Serialization(e.to_string())
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
