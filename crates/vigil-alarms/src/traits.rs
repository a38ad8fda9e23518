//! Collaborator interfaces the coordinator drives during a transition.
//!
//! Both are called synchronously on the calling thread. The coordinator
//! never retries either of them.

use crate::error::StoreResult;
use crate::types::AlarmRecord;

/// Durable storage for alarm rows.
pub trait AlarmStore: Send + Sync {
    /// Load every persisted alarm. Called once, before the coordinator
    /// serves any request.
    fn load_all(&self) -> StoreResult<Vec<AlarmRecord>>;

    /// Insert or update one alarm row, keyed by name.
    ///
    /// Returns `Ok(true)` when the row was written, `Ok(false)` when the
    /// backend accepted the call but did not apply it.
    fn upsert(&self, record: &AlarmRecord) -> StoreResult<bool>;
}

/// Outbound notification channel for alarm transitions.
pub trait Notifier: Send + Sync {
    /// Deliver `(code, payload)` on `topic` to `recipient`.
    ///
    /// Returns `true` only when delivery was confirmed.
    fn deliver(&self, recipient: &str, topic: &str, code: i32, payload: i32) -> bool;
}
