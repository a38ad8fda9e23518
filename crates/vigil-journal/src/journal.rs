use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::JournalConfig;
use crate::error::{JournalError, Result};
use crate::gate::Gate;
use crate::record::LogRecord;
use crate::sink::RotatingFile;

/// Capacity of the line broadcast used by [`Journal::subscribe`].
const LINE_CHANNEL_CAPACITY: usize = 256;

/// What happened to a submitted line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Timestamped and queued for the drain loop.
    Queued,
    /// Dropped because the gate is closed.
    Suppressed,
}

struct Inner {
    config: JournalConfig,
    tx: mpsc::UnboundedSender<LogRecord>,
    gate: Arc<Gate>,
    pending: Arc<AtomicUsize>,
    disposed: AtomicBool,
    shutdown: broadcast::Sender<()>,
    lines: broadcast::Sender<String>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Asynchronous, rotating log writer.
///
/// Producers call [`submit`](Self::submit) from any thread; lines are
/// timestamped and moved onto an unbounded queue without touching the file.
/// A single drain task writes them in order to a [`RotatingFile`], releasing
/// a line only after a confirmed write. On a write error or an oversized
/// target the drain task rotates and retries the same line, so lines are
/// delayed but never lost to rotation.
///
/// Ingestion sits behind a gate. [`disable`](Self::disable), an unwritable
/// target, or a run of failed writes closes it; it re-opens on its own after
/// the configured cooldown.
///
/// `Journal` is a cheap handle; clones share one queue and one drain task.
#[derive(Clone)]
pub struct Journal {
    inner: Arc<Inner>,
}

impl Journal {
    /// Open the target and spawn the drain task on the current runtime.
    pub fn start(config: JournalConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| JournalError::NoRuntime)?;

        let mut sink = RotatingFile::new(&config.dir, &config.file_name, config.max_file_size);
        sink.open()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown, _) = broadcast::channel(1);
        let (lines, _) = broadcast::channel(LINE_CHANNEL_CAPACITY);
        let gate = Arc::new(Gate::new(config.cooldown(), runtime.clone(), shutdown.clone()));
        let pending = Arc::new(AtomicUsize::new(0));

        let drain = DrainLoop {
            rx,
            sink,
            gate: Arc::clone(&gate),
            pending: Arc::clone(&pending),
            shutdown_rx: shutdown.subscribe(),
            poll_interval: config.poll_interval(),
            rotation_pause: config.rotation_pause(),
            failure_threshold: config.failure_threshold.max(1),
        };
        let task = runtime.spawn(drain.run());

        info!(path = %config.target_path().display(), "journal started");

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                tx,
                gate,
                pending,
                disposed: AtomicBool::new(false),
                shutdown,
                lines,
                task: Mutex::new(Some(task)),
            }),
        })
    }

    /// Timestamp and enqueue `line`. Never blocks on I/O.
    ///
    /// While the gate is closed the line is suppressed and a cooldown is
    /// armed if none is pending.
    pub fn submit(&self, line: &str) -> Result<Submission> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(JournalError::Disposed);
        }
        if !self.inner.gate.is_open() {
            self.inner.gate.ensure_cooldown();
            return Ok(Submission::Suppressed);
        }

        let record = LogRecord::now(line);
        if self.inner.config.broadcast_lines {
            // No receivers is not an error for the writer.
            let _ = self.inner.lines.send(record.as_str().to_string());
        }

        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        if self.inner.tx.send(record).is_err() {
            self.inner.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(JournalError::Disposed);
        }
        Ok(Submission::Queued)
    }

    /// Re-open the gate immediately, cancelling any pending cooldown.
    pub fn enable(&self) {
        self.inner.gate.open();
        debug!("journal enabled");
    }

    /// Close the gate. It re-opens by itself after the cooldown.
    pub fn disable(&self) {
        self.inner.gate.close();
        debug!("journal disabled");
    }

    /// `true` while the gate accepts submissions.
    pub fn is_enabled(&self) -> bool {
        self.inner.gate.is_open()
    }

    /// Lines queued but not yet confirmed written.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Receive a copy of every line queued from now on. Only fed when
    /// `broadcast_lines` is set.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inner.lines.subscribe()
    }

    /// The configuration this journal was started with.
    pub fn config(&self) -> &JournalConfig {
        &self.inner.config
    }

    /// Wait until every queued line has been written.
    ///
    /// Fails with [`JournalError::Disposed`] if the journal is shut down
    /// while lines are still pending.
    pub async fn drain(&self) -> Result<()> {
        loop {
            if self.pending() == 0 {
                return Ok(());
            }
            if self.inner.disposed.load(Ordering::Acquire) {
                return Err(JournalError::Disposed);
            }
            tokio::time::sleep(self.inner.config.poll_interval()).await;
        }
    }

    /// Stop the drain task after its current write attempt.
    ///
    /// Lines still queued are abandoned; call [`drain`](Self::drain) first
    /// when they matter. Idempotent.
    pub async fn shutdown(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Receivers may already be gone if the drain task exited on its own.
        let _ = self.inner.shutdown.send(());

        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "journal drain task ended abnormally");
            }
        }
        info!(abandoned = self.pending(), "journal shut down");
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.inner.config.target_path())
            .field("enabled", &self.is_enabled())
            .field("pending", &self.pending())
            .finish()
    }
}

/// The single consumer of the journal queue.
struct DrainLoop {
    rx: mpsc::UnboundedReceiver<LogRecord>,
    sink: RotatingFile,
    gate: Arc<Gate>,
    pending: Arc<AtomicUsize>,
    shutdown_rx: broadcast::Receiver<()>,
    poll_interval: Duration,
    rotation_pause: Duration,
    failure_threshold: u32,
}

impl DrainLoop {
    async fn run(mut self) {
        // The head record: taken off the queue but not yet written.
        let mut in_flight: Option<LogRecord> = None;
        let mut failures = 0u32;

        loop {
            if self.shutdown_requested() {
                break;
            }

            let record = match in_flight.take() {
                Some(record) => record,
                None => match self.rx.try_recv() {
                    Ok(record) => record,
                    Err(mpsc::error::TryRecvError::Empty) => {
                        if self.suspend(self.poll_interval).await {
                            break;
                        }
                        continue;
                    }
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        debug!("journal queue closed");
                        break;
                    }
                },
            };

            if self.sink.needs_rotation() {
                debug!(written = self.sink.written(), "journal target full; rotating");
                in_flight = Some(record);
                self.sink.close();
                if self.suspend(self.rotation_pause).await {
                    break;
                }
                self.reopen();
                continue;
            }

            match self.sink.write_line(record.as_str()) {
                Ok(()) => {
                    failures = 0;
                    self.pending.fetch_sub(1, Ordering::AcqRel);
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "journal write failed; reopening target");
                    in_flight = Some(record);
                    self.sink.close();
                    self.reopen();
                    if failures >= self.failure_threshold {
                        warn!(failures, "journal failing repeatedly; closing gate");
                        self.gate.trip();
                        failures = 0;
                    }
                    if self.suspend(self.poll_interval).await {
                        break;
                    }
                }
            }
        }

        self.sink.close();
        debug!("journal drain loop stopped");
    }

    fn reopen(&mut self) {
        match self.sink.open() {
            Ok(archived) => {
                if let Some(path) = archived {
                    info!(archive = %path.display(), "journal target rotated");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!(error = %e, "journal target not writable; closing gate");
                self.gate.trip();
            }
            Err(e) => {
                warn!(error = %e, "failed to reopen journal target");
            }
        }
    }

    fn shutdown_requested(&mut self) -> bool {
        !matches!(
            self.shutdown_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        )
    }

    /// Sleep for `period` unless shutdown arrives first. Returns `true` on
    /// shutdown.
    async fn suspend(&mut self, period: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown_rx.recv() => true,
            _ = tokio::time::sleep(period) => false,
        }
    }
}
