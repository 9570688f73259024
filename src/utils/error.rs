//! Error handling for the positioning service.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the positioning service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The dataset provider could not deliver the reference records
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A shard task terminated abnormally
    #[error("Worker failure on shard {shard}: {reason}")]
    WorkerFailure { shard: usize, reason: String },

    /// The request deadline expired before every shard reported back
    #[error("Estimation timed out after {0:?}")]
    Timeout(Duration),

    /// A shard worker stopped because the request was cancelled
    #[error("Shard work cancelled")]
    Cancelled,

    /// Password did not match the stored hash
    #[error("Password invalid")]
    Unauthorized,

    /// Password file unreadable or malformed
    #[error("Auth error: {0}")]
    AuthError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for the positioning service
pub type Result<T> = std::result::Result<T, Error>;

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Other(format!("blocking task failed: {}", err))
    }
}
