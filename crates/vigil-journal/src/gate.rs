use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Ingestion gate with a self-resetting cooldown.
///
/// Closing the gate arms a one-shot timer that re-opens it after `cooldown`.
/// Every open/close bumps `generation`; a timer only re-opens the gate if the
/// generation it was armed under is still current, so a stale timer can never
/// cut a later cooldown short.
pub(crate) struct Gate {
    enabled: AtomicBool,
    generation: AtomicU64,
    cooldown_pending: AtomicBool,
    cooldown: Duration,
    runtime: Handle,
    shutdown: broadcast::Sender<()>,
}

impl Gate {
    pub(crate) fn new(cooldown: Duration, runtime: Handle, shutdown: broadcast::Sender<()>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            cooldown_pending: AtomicBool::new(false),
            cooldown,
            runtime,
            shutdown,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn open(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cooldown_pending.store(false, Ordering::Release);
        self.enabled.store(true, Ordering::Release);
    }

    /// Close the gate and arm a fresh cooldown.
    pub(crate) fn close(self: &Arc<Self>) {
        self.enabled.store(false, Ordering::Release);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.cooldown_pending.store(true, Ordering::Release);
        self.arm(generation);
    }

    /// Close the gate on behalf of a failing sink. An already closed gate
    /// keeps its pending cooldown instead of arming another one.
    pub(crate) fn trip(self: &Arc<Self>) {
        if self.is_open() {
            self.close();
        } else {
            self.ensure_cooldown();
        }
    }

    /// Arm a cooldown for the current closure unless one is already pending.
    pub(crate) fn ensure_cooldown(self: &Arc<Self>) {
        if self
            .cooldown_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let generation = self.generation.load(Ordering::Acquire);
            self.arm(generation);
        }
    }

    fn arm(self: &Arc<Self>, generation: u64) {
        let gate = Arc::clone(self);
        let mut shutdown_rx = self.shutdown.subscribe();
        debug!(generation, cooldown_ms = self.cooldown.as_millis() as u64, "journal cooldown armed");

        self.runtime.spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => {}
                _ = tokio::time::sleep(gate.cooldown) => {
                    if gate
                        .generation
                        .compare_exchange(generation, generation + 1, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        gate.cooldown_pending.store(false, Ordering::Release);
                        gate.enabled.store(true, Ordering::Release);
                        info!("journal re-enabled after cooldown");
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(cooldown_ms: u64) -> Arc<Gate> {
        let (tx, _) = broadcast::channel(1);
        Arc::new(Gate::new(Duration::from_millis(cooldown_ms), Handle::current(), tx))
    }

    #[tokio::test]
    async fn close_then_cooldown_reopens() {
        let gate = gate(20);
        gate.close();
        assert!(!gate.is_open());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn stale_timer_does_not_shorten_new_cooldown() {
        let gate = gate(200);
        gate.close();
        tokio::time::sleep(Duration::from_millis(100)).await;
        gate.open();
        gate.close();
        // The first timer fires around t=200ms; the second not before t=300ms.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!gate.is_open());
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn repeated_trips_share_one_cooldown() {
        let gate = gate(60_000);
        gate.trip();
        assert!(!gate.is_open());
        let generation = gate.generation.load(Ordering::Acquire);

        for _ in 0..100 {
            gate.trip();
        }
        assert_eq!(gate.generation.load(Ordering::Acquire), generation);
        assert!(gate.cooldown_pending.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn trip_reopens_after_cooldown() {
        let gate = gate(20);
        gate.trip();
        gate.trip();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_cooldown() {
        let (tx, _) = broadcast::channel(1);
        let gate = Arc::new(Gate::new(Duration::from_millis(20), Handle::current(), tx.clone()));
        gate.close();
        tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!gate.is_open());
    }
}
