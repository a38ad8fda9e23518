//! Wiring shared by the `vigil` binary and its integration tests.

pub mod config;
pub mod notifier;

pub use config::VigilConfig;
pub use notifier::JournalNotifier;
