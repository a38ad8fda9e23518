//! Backing stores for settings.
//!
//! [`SettingsStore`] is the interface the service reads through.
//! [`InMemorySettingsStore`] is for tests and ephemeral use;
//! [`JsonFileSettingsStore`] keeps a flat JSON object on disk.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use tempfile::NamedTempFile;

use crate::error::{Result, SettingsError};

/// Durable key/value storage for settings.
pub trait SettingsStore: Send + Sync {
    /// Read the stored value for `key`. `Ok(None)` if the key is unset.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value for `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// An in-memory implementation of [`SettingsStore`].
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
            ..Self::default()
        }
    }

    /// Number of `read` calls received.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every `read` fail until turned off again.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `write` fail until turned off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SettingsError::Store("injected read failure".into()));
        }
        let values = self
            .values
            .read()
            .map_err(|e| SettingsError::Store(format!("lock poisoned: {e}")))?;
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SettingsError::Store("injected write failure".into()));
        }
        let mut values = self
            .values
            .write()
            .map_err(|e| SettingsError::Store(format!("lock poisoned: {e}")))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A [`SettingsStore`] persisted as one JSON object of string values.
///
/// Writes go through a temp file and an atomic rename.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, values)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| SettingsError::Io(e.error))?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| SettingsError::Store(format!("lock poisoned: {e}")))?;
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }
}
