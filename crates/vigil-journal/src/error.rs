use std::io;

/// Errors produced by the journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// I/O error while preparing the log directory or target file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The journal has been shut down and no longer accepts lines.
    #[error("journal is shut down")]
    Disposed,

    /// `Journal::start` was called outside a tokio runtime.
    #[error("journal must be started inside a tokio runtime")]
    NoRuntime,
}

/// Convenience alias used throughout the journal crate.
pub type Result<T> = std::result::Result<T, JournalError>;
