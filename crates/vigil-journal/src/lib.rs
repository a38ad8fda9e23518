//! Asynchronous durable journal for Vigil.
//!
//! Producers hand lines to a [`Journal`] without waiting on the filesystem.
//! One background task drains the queue into a rotating, append-only file,
//! holding each line until its write is confirmed. A gate in front of the
//! queue acts as a circuit breaker: it closes on request or when the target
//! keeps failing, and re-opens itself after a cooldown.
//!
//! [`JournalLayer`] bridges `tracing` into the journal so every component's
//! diagnostics end up in the same file.

pub mod config;
pub mod error;
mod gate;
pub mod journal;
pub mod layer;
pub mod record;
pub mod sink;

pub use config::JournalConfig;
pub use error::{JournalError, Result};
pub use journal::{Journal, Submission};
pub use layer::JournalLayer;
pub use record::LogRecord;
pub use sink::RotatingFile;
