use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

const FOOTER: &str = "*** Closing log file ***";

/// Append-only text target with size-triggered rotation.
///
/// The live file always sits at `dir/file_name`. Opening the target while a
/// live file exists first renames it to `log_<yyMMdd-HHmmss>.log` (suffixed
/// with `-N` when that name is taken), then starts a fresh file with a header
/// line naming the archive.
///
/// Lines are flushed on every write so that a successful `write_line` means
/// the line reached the OS.
pub struct RotatingFile {
    dir: PathBuf,
    path: PathBuf,
    max_size: u64,
    writer: Option<BufWriter<File>>,
    /// Bytes written to the live file since it was opened.
    written: u64,
    /// Lines written to the live file since it was opened.
    lines: u64,
}

impl RotatingFile {
    /// Describe a target without touching the filesystem.
    pub fn new(dir: &Path, file_name: &str, max_size: u64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            path: dir.join(file_name),
            max_size,
            writer: None,
            written: 0,
            lines: 0,
        }
    }

    /// Open a fresh live file, archiving any existing one.
    ///
    /// Returns the archive path when a previous file was moved aside.
    pub fn open(&mut self) -> io::Result<Option<PathBuf>> {
        fs::create_dir_all(&self.dir)?;

        let archived = if self.path.exists() {
            let archive = self.archive_path();
            fs::rename(&self.path, &archive)?;
            Some(archive)
        } else {
            None
        };

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        let previous = archived
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string());
        let header = format!("*** New log file created - previous: {previous} ***");
        writeln!(writer, "{header}")?;
        writer.flush()?;

        self.written = header.len() as u64 + 1;
        self.lines = 0;
        self.writer = Some(writer);

        debug!(path = %self.path.display(), archived = ?archived, "journal target opened");
        Ok(archived)
    }

    /// Write the footer and release the live file. Errors are logged and
    /// swallowed; the handle is dropped either way.
    pub fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let result = writeln!(writer, "{FOOTER}").and_then(|()| writer.flush());
            if let Err(e) = result {
                warn!(path = %self.path.display(), error = %e, "failed to close journal target cleanly");
            }
        }
        self.written = 0;
        self.lines = 0;
    }

    /// Append one line to the live file.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "journal target is not open")
        })?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        self.written += line.len() as u64 + 1;
        self.lines += 1;
        Ok(())
    }

    /// `true` once the live file has grown past the size threshold. A file
    /// holding only its header never needs rotation, whatever the threshold.
    pub fn needs_rotation(&self) -> bool {
        self.writer.is_some() && self.lines > 0 && self.written > self.max_size
    }

    /// Bytes written to the live file since it was opened.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Path of the live file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn archive_path(&self) -> PathBuf {
        let stamp = Local::now().format("%y%m%d-%H%M%S").to_string();
        let candidate = self.dir.join(format!("log_{stamp}.log"));
        if !candidate.exists() {
            return candidate;
        }
        (1u32..)
            .map(|n| self.dir.join(format!("log_{stamp}-{n}.log")))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl Drop for RotatingFile {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archives(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("log_"))
            })
            .collect();
        found.sort();
        found
    }

    #[test]
    fn open_writes_header_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RotatingFile::new(dir.path(), "journal.log", 1024);

        assert_eq!(sink.open().unwrap(), None);
        sink.write_line("first").unwrap();
        sink.write_line("second").unwrap();
        sink.close();

        let content = fs::read_to_string(dir.path().join("journal.log")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "*** New log file created - previous: none ***");
        assert_eq!(&lines[1..3], &["first", "second"]);
        assert_eq!(lines[3], FOOTER);
    }

    #[test]
    fn write_on_closed_target_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RotatingFile::new(dir.path(), "journal.log", 1024);
        let err = sink.write_line("lost").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn reopen_archives_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RotatingFile::new(dir.path(), "journal.log", 1024);
        sink.open().unwrap();
        sink.write_line("before rotation").unwrap();
        sink.close();

        let archived = sink.open().unwrap().expect("previous file archived");
        assert!(archived.exists());
        let old = fs::read_to_string(&archived).unwrap();
        assert!(old.contains("before rotation"));

        let live = fs::read_to_string(sink.path()).unwrap();
        assert!(live.contains(&archived.display().to_string()));
        assert!(!live.contains("before rotation"));
    }

    #[test]
    fn archive_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RotatingFile::new(dir.path(), "journal.log", 1024);
        for _ in 0..4 {
            sink.open().unwrap();
            sink.close();
        }
        assert_eq!(archives(dir.path()).len(), 3);
    }

    #[test]
    fn rotation_threshold_tracks_bytes_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RotatingFile::new(dir.path(), "journal.log", 64);
        sink.open().unwrap();
        assert!(!sink.needs_rotation());

        sink.write_line(&"x".repeat(40)).unwrap();
        assert!(sink.needs_rotation());

        sink.close();
        assert!(!sink.needs_rotation());
    }

    #[test]
    fn header_alone_never_triggers_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RotatingFile::new(dir.path(), "journal.log", 0);
        sink.open().unwrap();
        assert!(!sink.needs_rotation());
        sink.write_line("one").unwrap();
        assert!(sink.needs_rotation());
    }
}
