//! The settings service: a read-through cache with periodic refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vigil_cache::VersionedCache;

use crate::config::SettingsConfig;
use crate::error::{Result, SettingsError};
use crate::store::SettingsStore;

/// Cached access to string settings held in a [`SettingsStore`].
///
/// Values are read from the store once and served from a
/// [`VersionedCache`] afterwards. The cache is dropped wholesale on
/// [`update`](Self::update) and on every refresh tick, so changes made
/// behind the service's back show up within one refresh interval.
pub struct SettingsService {
    cache: Arc<VersionedCache<String, String>>,
    store: Arc<dyn SettingsStore>,
    config: SettingsConfig,
    disposed: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    refresh: Mutex<Option<JoinHandle<()>>>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, config: SettingsConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            cache: Arc::new(VersionedCache::new()),
            store,
            config,
            disposed: AtomicBool::new(false),
            shutdown_tx,
            refresh: Mutex::new(None),
        }
    }

    /// The value of `key`.
    ///
    /// A key the store does not have, or cannot read, yields the empty
    /// string. That result is cached like any other until the next refresh.
    pub fn get(&self, key: &str) -> Result<String> {
        self.ensure_live()?;
        Ok(self
            .cache
            .get_or_add(key.to_string(), |k| self.read_through(k)))
    }

    /// Store `value` under `key`, then re-read it through a cleared cache.
    ///
    /// Returns `Ok(true)` when the value read back equals `value`.
    pub fn update(&self, key: &str, value: &str) -> Result<bool> {
        self.ensure_live()?;

        self.store.write(key, value)?;
        info!(key, value, "setting saved");

        self.cache.clear();
        let stored = self
            .cache
            .get_or_add(key.to_string(), |k| self.read_through(k));
        if stored != value {
            warn!(key, expected = value, found = %stored, "setting did not read back as written");
        }
        Ok(stored == value)
    }

    /// Spawn the task that clears the cache every refresh interval.
    ///
    /// Calling this while a refresh task is running does nothing.
    pub fn start_refresh(&self) -> Result<()> {
        self.ensure_live()?;
        let runtime = Handle::try_current().map_err(|_| SettingsError::NoRuntime)?;

        let mut slot = self
            .refresh
            .lock()
            .map_err(|e| SettingsError::Store(format!("lock poisoned: {e}")))?;
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let mut shutdown = self.shutdown_tx.subscribe();
        // Re-checked after subscribing so a concurrent shutdown cannot be missed.
        self.ensure_live()?;

        let cache = Arc::clone(&self.cache);
        let interval = self.config.refresh_interval();
        *slot = Some(runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(interval) => {
                        cache.clear();
                        debug!("settings cache cleared");
                    }
                }
            }
        }));

        debug!(interval_ms = self.config.refresh_interval_ms, "settings refresh started");
        Ok(())
    }

    /// Stop the refresh task and refuse further requests. Idempotent.
    pub async fn shutdown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());

        let task = match self.refresh.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            let _ = task.await;
        }

        self.cache.clear();
        info!("settings service shut down");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Number of cached settings.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn config(&self) -> &SettingsConfig {
        &self.config
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(SettingsError::Disposed)
        } else {
            Ok(())
        }
    }

    fn read_through(&self, key: &str) -> String {
        match self.store.read(key) {
            Ok(Some(value)) => {
                debug!(key, value = %value, "setting read");
                value
            }
            Ok(None) => {
                warn!(key, "setting not found");
                String::new()
            }
            Err(e) => {
                warn!(key, error = %e, "failed to read setting");
                String::new()
            }
        }
    }
}

impl Drop for SettingsService {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for SettingsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsService")
            .field("cached", &self.cache.len())
            .field("config", &self.config)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
