//! JSON-file alarm store.
//!
//! The whole table lives in one JSON array. Every upsert rewrites the file
//! through a temp file in the same directory followed by an atomic rename,
//! so readers never see a half-written table.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::AlarmStore;
use crate::types::AlarmRecord;

/// An [`AlarmStore`] persisted as a single JSON file.
#[derive(Debug)]
pub struct JsonFileAlarmStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileAlarmStore {
    /// Use `path` as the backing file. The file is created on first upsert.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> StoreResult<Vec<AlarmRecord>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_rows(&self, rows: &[AlarmRecord]) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, rows)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl AlarmStore for JsonFileAlarmStore {
    fn load_all(&self) -> StoreResult<Vec<AlarmRecord>> {
        let rows = self.read_rows()?;
        debug!(path = %self.path.display(), count = rows.len(), "loaded alarm table");
        Ok(rows)
    }

    fn upsert(&self, record: &AlarmRecord) -> StoreResult<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;

        let mut rows = self.read_rows()?;
        match rows.iter_mut().find(|r| r.name == record.name) {
            Some(row) => *row = record.clone(),
            None => rows.push(record.clone()),
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        self.write_rows(&rows)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlarmState;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileAlarmStore::new(dir.path().join("alarms.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn upsert_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("alarms.json");

        let store = JsonFileAlarmStore::new(&path);
        store.upsert(&AlarmRecord::new("pump", 2, AlarmState::Recovered)).unwrap();
        store.upsert(&AlarmRecord::new("door", 1, AlarmState::Recovered)).unwrap();
        store.upsert(&AlarmRecord::new("pump", 2, AlarmState::Thrown)).unwrap();

        let reopened = JsonFileAlarmStore::new(&path);
        assert_eq!(
            reopened.load_all().unwrap(),
            vec![
                AlarmRecord::new("door", 1, AlarmState::Recovered),
                AlarmRecord::new("pump", 2, AlarmState::Thrown),
            ]
        );
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileAlarmStore::new(&path);
        assert!(matches!(store.load_all(), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileAlarmStore::new(dir.path().join("alarms.json"));
        for id in 0..5 {
            store.upsert(&AlarmRecord::new(format!("a{id}"), id, AlarmState::Thrown)).unwrap();
        }
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
