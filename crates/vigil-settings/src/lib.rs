//! Read-through settings for Vigil.
//!
//! A [`SettingsService`] serves string settings from a [`SettingsStore`],
//! caching each value on first read in a lock-free
//! [`VersionedCache`](vigil_cache::VersionedCache). A background task drops
//! the cache periodically so external edits are picked up.

pub mod config;
pub mod error;
pub mod service;
pub mod store;

pub use config::SettingsConfig;
pub use error::{Result, SettingsError};
pub use service::SettingsService;
pub use store::{InMemorySettingsStore, JsonFileSettingsStore, SettingsStore};
