//! Error types for the settings service.

use thiserror::Error;

/// Errors raised by the settings service and its stores.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backing store rejected or failed the request.
    #[error("settings store error: {0}")]
    Store(String),

    /// I/O error from a file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored table could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The service has been shut down.
    #[error("settings service has been shut down")]
    Disposed,

    /// The refresh task needs a tokio runtime and none is running.
    #[error("no tokio runtime available for the refresh task")]
    NoRuntime,
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Serialization(e.to_string())
    }
}

/// Convenience alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
