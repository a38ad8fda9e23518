use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`Journal`](crate::Journal).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Directory holding the live target and its archives.
    pub dir: PathBuf,
    /// File name of the live target inside `dir`.
    pub file_name: String,
    /// Size in bytes past which the target is rotated (default: 2 MiB).
    pub max_file_size: u64,
    /// Idle wait between empty-queue checks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Wait between closing and reopening the target on rotation, in milliseconds.
    pub rotation_pause_ms: u64,
    /// How long the gate stays closed before it re-opens itself, in milliseconds.
    pub cooldown_ms: u64,
    /// Consecutive failed writes that trip the circuit breaker.
    pub failure_threshold: u32,
    /// Publish every queued line to [`Journal::subscribe`](crate::Journal::subscribe) receivers.
    pub broadcast_lines: bool,
}

impl JournalConfig {
    /// Default configuration rooted at `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rotation_pause(&self) -> Duration {
        Duration::from_millis(self.rotation_pause_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Full path of the live target.
    pub fn target_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "journal.log".to_string(),
            max_file_size: 2 * 1024 * 1024, // 2 MiB
            poll_interval_ms: 100,
            rotation_pause_ms: 100,
            cooldown_ms: 5 * 60 * 1000, // 5 minutes
            failure_threshold: 5,
            broadcast_lines: false,
        }
    }
}
