use std::fmt;

use chrono::{DateTime, Local};

/// A timestamped journal line, moved from producer to the drain loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    text: String,
}

impl LogRecord {
    /// Stamp `line` with the current local time.
    pub fn now(line: &str) -> Self {
        Self::at(Local::now(), line)
    }

    /// Stamp `line` with an explicit time.
    pub fn at(when: DateTime<Local>, line: &str) -> Self {
        Self {
            text: format!("[{}] - {line}", when.format("%Y/%m/%d - %H:%M:%S%.3f")),
        }
    }

    /// The rendered line as written to the target.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
