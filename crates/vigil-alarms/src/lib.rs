//! Alarm coordination for Vigil.
//!
//! An alarm is a named, identified flag that is either thrown or recovered.
//! Its state lives in three places: an external monitor reached through a
//! [`Notifier`], the coordinator's memory, and an [`AlarmStore`]. The
//! [`AlarmCoordinator`] moves all three in a fixed order and reports how far
//! each transition got.
//!
//! # Modules
//!
//! - [`coordinator`] -- [`AlarmCoordinator`]: bootstrap, registration, transitions
//! - [`traits`] -- [`AlarmStore`] and [`Notifier`] collaborator interfaces
//! - [`memory`] -- in-memory store and recording notifier
//! - [`file`] -- JSON-file store
//! - [`types`] -- [`AlarmState`], [`AlarmRecord`], outcomes
//! - [`names`] -- argument validation
//! - [`config`] -- [`CoordinatorConfig`]
//! - [`error`] -- error types

pub mod config;
pub mod coordinator;
pub mod error;
pub mod file;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use config::CoordinatorConfig;
pub use coordinator::AlarmCoordinator;
pub use error::{AlarmError, Result, StoreError, StoreResult};
pub use file::JsonFileAlarmStore;
pub use memory::{Delivery, InMemoryAlarmStore, RecordingNotifier};
pub use traits::{AlarmStore, Notifier};
pub use types::{AlarmInfo, AlarmRecord, AlarmState, Registration, TransitionOutcome};
