//! Error types for alarm coordination and alarm stores.

use thiserror::Error;

/// Errors raised by an [`AlarmStore`](crate::AlarmStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from a file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend is unreachable or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Convenience alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by the [`AlarmCoordinator`](crate::AlarmCoordinator).
#[derive(Debug, Error)]
pub enum AlarmError {
    /// A caller passed a malformed name or identifier.
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    /// No alarm is registered under this name.
    #[error("alarm not found: {name}")]
    NotFound { name: String },

    /// The durable store failed during bootstrap.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for coordinator operations.
pub type Result<T> = std::result::Result<T, AlarmError>;
