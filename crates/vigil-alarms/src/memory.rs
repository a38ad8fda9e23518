//! In-memory collaborators for tests and ephemeral use.
//!
//! [`InMemoryAlarmStore`] keeps rows in a `BTreeMap` behind a `RwLock`.
//! [`RecordingNotifier`] records every delivery it accepts and can be told to
//! refuse.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::traits::{AlarmStore, Notifier};
use crate::types::AlarmRecord;

/// An in-memory implementation of [`AlarmStore`].
#[derive(Debug, Default)]
pub struct InMemoryAlarmStore {
    rows: RwLock<BTreeMap<String, AlarmRecord>>,
    fail_next_upsert: AtomicBool,
    upserts: AtomicUsize,
}

impl InMemoryAlarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = AlarmRecord>) -> Self {
        let rows = records.into_iter().map(|r| (r.name.clone(), r)).collect();
        Self {
            rows: RwLock::new(rows),
            ..Self::default()
        }
    }

    /// Make the next `upsert` call fail with [`StoreError::Unavailable`].
    pub fn fail_next_upsert(&self) {
        self.fail_next_upsert.store(true, Ordering::SeqCst);
    }

    /// Number of `upsert` calls received, failed ones included.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Read one row back.
    pub fn get(&self, name: &str) -> Option<AlarmRecord> {
        self.rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

impl AlarmStore for InMemoryAlarmStore {
    fn load_all(&self) -> StoreResult<Vec<AlarmRecord>> {
        let rows = self
            .rows
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(rows.values().cloned().collect())
    }

    fn upsert(&self, record: &AlarmRecord) -> StoreResult<bool> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_upsert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected upsert failure".into()));
        }

        let mut rows = self
            .rows
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        rows.insert(record.name.clone(), record.clone());
        Ok(true)
    }
}

/// One accepted delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: String,
    pub topic: String,
    pub code: i32,
    pub payload: i32,
}

/// A [`Notifier`] that records what it is asked to deliver.
#[derive(Debug)]
pub struct RecordingNotifier {
    accept: AtomicBool,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    /// A notifier that accepts every delivery.
    pub fn new() -> Self {
        Self {
            accept: AtomicBool::new(true),
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// A notifier that refuses every delivery.
    pub fn refusing() -> Self {
        let notifier = Self::new();
        notifier.set_accepting(false);
        notifier
    }

    pub fn set_accepting(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    /// Number of `deliver` calls received, refused ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Accepted deliveries, in call order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, recipient: &str, topic: &str, code: i32, payload: i32) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.accept.load(Ordering::SeqCst) {
            return false;
        }
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Delivery {
                recipient: recipient.to_string(),
                topic: topic.to_string(),
                code,
                payload,
            });
        true
    }
}
