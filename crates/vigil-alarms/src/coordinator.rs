//! The alarm coordinator.
//!
//! Keeps three views of every alarm in step: the external notifier, the
//! in-memory state, and the durable store. A transition touches them in that
//! order and stops at the first step that fails. Nothing is rolled back and
//! nothing is retried; the returned [`TransitionOutcome`] says how far the
//! transition got.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};
use vigil_cache::{TryAdd, VersionedCache};

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::names::{validate_alarm_id, validate_alarm_name};
use crate::traits::{AlarmStore, Notifier};
use crate::types::{AlarmInfo, AlarmRecord, AlarmState, Registration, TransitionOutcome};

/// Contended inserts spin this many times before sleeping between attempts.
const SPIN_ATTEMPTS: u32 = 16;
const BACKOFF_SLEEP: Duration = Duration::from_millis(1);

/// Per-alarm state cell. Replaced wholesale on every transition.
type Slot = Arc<ArcSwap<AlarmInfo>>;

/// Coordinates alarm transitions across notifier, memory, and store.
///
/// The alarm table is a [`VersionedCache`] from name to slot: registration
/// only ever adds slots, and each slot is swapped independently, so
/// transitions on different alarms never contend.
pub struct AlarmCoordinator {
    alarms: VersionedCache<String, Slot>,
    store: Arc<dyn AlarmStore>,
    notifier: Arc<dyn Notifier>,
    config: CoordinatorConfig,
}

impl AlarmCoordinator {
    /// Load every alarm from `store` and return a ready coordinator.
    ///
    /// Rows with an empty name or a negative id are skipped. A failing
    /// `load_all` is returned as [`AlarmError::Store`](crate::AlarmError::Store).
    pub fn open(
        store: Arc<dyn AlarmStore>,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        let coordinator = Self {
            alarms: VersionedCache::new(),
            store,
            notifier,
            config,
        };

        let rows = coordinator.store.load_all()?;
        let total = rows.len();
        let mut loaded = 0usize;
        for row in rows {
            if let Err(e) = validate_alarm_name(&row.name).and(validate_alarm_id(row.id)) {
                warn!(alarm = %row.name, id = row.id, error = %e, "skipping invalid alarm row");
                continue;
            }
            match coordinator.install(&row.name, AlarmInfo { id: row.id, state: row.state }) {
                Registration::Created => loaded += 1,
                Registration::Existing { id, .. } => {
                    warn!(alarm = %row.name, id, duplicate_id = row.id, "duplicate alarm row ignored");
                }
            }
        }

        info!(loaded, skipped = total - loaded, "alarm coordinator ready");
        Ok(coordinator)
    }

    /// Register an alarm in the recovered state.
    ///
    /// An existing alarm is never overwritten; its current id and state are
    /// returned instead. A newly created alarm is also written to the store.
    /// A failed write is logged and the alarm stays registered in memory.
    pub fn register(&self, name: &str, id: i32) -> Result<Registration> {
        validate_alarm_name(name)?;
        validate_alarm_id(id)?;

        let registration = self.install(
            name,
            AlarmInfo {
                id,
                state: AlarmState::Recovered,
            },
        );

        match registration {
            Registration::Created => {
                info!(alarm = %name, id, "alarm registered");
                let record = AlarmRecord::new(name, id, AlarmState::Recovered);
                match self.store.upsert(&record) {
                    Ok(true) => {}
                    Ok(false) => warn!(alarm = %name, "store declined new alarm row"),
                    Err(e) => warn!(alarm = %name, error = %e, "failed to persist new alarm"),
                }
            }
            Registration::Existing { id: existing, .. } if existing != id => {
                warn!(alarm = %name, id = existing, requested = id, "alarm already registered with a different id");
            }
            Registration::Existing { .. } => {
                debug!(alarm = %name, "alarm already registered");
            }
        }
        Ok(registration)
    }

    /// Move `name` to `target`: notify, then swap memory, then persist.
    pub fn transition(&self, name: &str, target: AlarmState) -> TransitionOutcome {
        let Some(slot) = self.slot(name) else {
            debug!(alarm = %name, "transition on unknown alarm");
            return TransitionOutcome::NotFound;
        };

        let observed = slot.load_full();
        let id = observed.id;

        if !self
            .notifier
            .deliver(&self.config.recipient, &self.config.topic, target.notify_code(), id)
        {
            warn!(alarm = %name, id, state = %target, "notification not delivered");
            return TransitionOutcome::NotDelivered;
        }

        let next = Arc::new(AlarmInfo { id, state: target });
        let previous = slot.compare_and_swap(&observed, next);
        if !Arc::ptr_eq(&*previous, &observed) {
            warn!(alarm = %name, id, state = %target, "concurrent transition won the swap");
            return TransitionOutcome::LostRace;
        }

        match self.store.upsert(&AlarmRecord::new(name, id, target)) {
            Ok(true) => {
                info!(alarm = %name, id, state = %target, "alarm transition applied");
                TransitionOutcome::Applied
            }
            Ok(false) => {
                warn!(alarm = %name, id, state = %target, "store declined alarm update");
                TransitionOutcome::NotPersisted
            }
            Err(e) => {
                warn!(alarm = %name, id, state = %target, error = %e, "failed to persist alarm update");
                TransitionOutcome::NotPersisted
            }
        }
    }

    /// Shorthand for `transition(name, AlarmState::Thrown)`.
    pub fn throw(&self, name: &str) -> TransitionOutcome {
        self.transition(name, AlarmState::Thrown)
    }

    /// Shorthand for `transition(name, AlarmState::Recovered)`.
    pub fn recover(&self, name: &str) -> TransitionOutcome {
        self.transition(name, AlarmState::Recovered)
    }

    /// Current in-memory state of `name`, or `None` if it is not registered.
    pub fn status(&self, name: &str) -> Option<AlarmState> {
        self.slot(name).map(|slot| slot.load().state)
    }

    /// Every alarm's in-memory state, sorted by name.
    pub fn alarms(&self) -> Vec<AlarmRecord> {
        let snapshot = self.alarms.snapshot();
        let mut records: Vec<AlarmRecord> = snapshot
            .iter()
            .map(|(name, slot)| {
                let info = slot.load();
                AlarmRecord::new(name.clone(), info.id, info.state)
            })
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Notification addressing used by every transition.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn slot(&self, name: &str) -> Option<Slot> {
        self.alarms.snapshot().get(name).cloned()
    }

    /// Add a slot for `name` unless one exists, backing off while other
    /// inserts win the table swap.
    fn install(&self, name: &str, info: AlarmInfo) -> Registration {
        let mut candidate: Slot = Arc::new(ArcSwap::from_pointee(info));
        let mut attempts = 0u32;
        loop {
            match self.alarms.try_add(name.to_string(), candidate) {
                TryAdd::Inserted(_) => return Registration::Created,
                TryAdd::Exists(slot) => {
                    let current = slot.load();
                    return Registration::Existing {
                        id: current.id,
                        state: current.state,
                    };
                }
                TryAdd::Contended(back) => {
                    candidate = back;
                    attempts += 1;
                    if attempts < SPIN_ATTEMPTS {
                        thread::yield_now();
                    } else {
                        thread::sleep(BACKOFF_SLEEP);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for AlarmCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlarmCoordinator")
            .field("alarms", &self.alarms.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AlarmError, StoreError, StoreResult};
    use crate::memory::{InMemoryAlarmStore, RecordingNotifier};
    use std::sync::Barrier;

    fn setup() -> (Arc<InMemoryAlarmStore>, Arc<RecordingNotifier>, AlarmCoordinator) {
        let store = Arc::new(InMemoryAlarmStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator =
            AlarmCoordinator::open(store.clone(), notifier.clone(), CoordinatorConfig::default())
                .unwrap();
        (store, notifier, coordinator)
    }

    struct BrokenStore;

    impl AlarmStore for BrokenStore {
        fn load_all(&self) -> StoreResult<Vec<AlarmRecord>> {
            Err(StoreError::Unavailable("database offline".into()))
        }
        fn upsert(&self, _record: &AlarmRecord) -> StoreResult<bool> {
            Ok(false)
        }
    }

    /// Holds every caller inside `deliver` until `parties` callers arrived.
    struct BarrierNotifier {
        barrier: Barrier,
        inner: RecordingNotifier,
    }

    impl Notifier for BarrierNotifier {
        fn deliver(&self, recipient: &str, topic: &str, code: i32, payload: i32) -> bool {
            let accepted = self.inner.deliver(recipient, topic, code, payload);
            self.barrier.wait();
            accepted
        }
    }

    // ---- Bootstrap ----

    #[test]
    fn open_loads_store_rows() {
        let store = Arc::new(InMemoryAlarmStore::with_records([
            AlarmRecord::new("door", 1, AlarmState::Thrown),
            AlarmRecord::new("pump", 2, AlarmState::Recovered),
        ]));
        let coordinator = AlarmCoordinator::open(
            store,
            Arc::new(RecordingNotifier::new()),
            CoordinatorConfig::default(),
        )
        .unwrap();

        assert_eq!(coordinator.status("door"), Some(AlarmState::Thrown));
        assert_eq!(coordinator.status("pump"), Some(AlarmState::Recovered));
        assert_eq!(coordinator.alarms().len(), 2);
    }

    #[test]
    fn open_skips_invalid_rows() {
        let store = Arc::new(InMemoryAlarmStore::with_records([
            AlarmRecord::new("", 1, AlarmState::Thrown),
            AlarmRecord::new("neg", -4, AlarmState::Thrown),
            AlarmRecord::new("ok", 3, AlarmState::Thrown),
        ]));
        let coordinator = AlarmCoordinator::open(
            store,
            Arc::new(RecordingNotifier::new()),
            CoordinatorConfig::default(),
        )
        .unwrap();

        assert_eq!(
            coordinator.alarms(),
            vec![AlarmRecord::new("ok", 3, AlarmState::Thrown)]
        );
    }

    #[test]
    fn open_propagates_load_failure() {
        let err = AlarmCoordinator::open(
            Arc::new(BrokenStore),
            Arc::new(RecordingNotifier::new()),
            CoordinatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AlarmError::Store(StoreError::Unavailable(_))));
    }

    // ---- Registration ----

    #[test]
    fn register_creates_recovered_alarm() {
        let (store, _, coordinator) = setup();
        assert_eq!(coordinator.register("door", 5).unwrap(), Registration::Created);
        assert_eq!(coordinator.status("door"), Some(AlarmState::Recovered));
        assert_eq!(
            store.get("door"),
            Some(AlarmRecord::new("door", 5, AlarmState::Recovered))
        );
    }

    #[test]
    fn register_rejects_bad_arguments() {
        let (_, _, coordinator) = setup();
        assert!(matches!(
            coordinator.register("", 1),
            Err(AlarmError::InvalidArgument { field: "name", .. })
        ));
        assert!(matches!(
            coordinator.register("door", -1),
            Err(AlarmError::InvalidArgument { field: "id", .. })
        ));
        assert!(coordinator.alarms().is_empty());
    }

    #[test]
    fn register_never_overwrites() {
        let (_, _, coordinator) = setup();
        coordinator.register("door", 5).unwrap();
        assert!(coordinator.throw("door").is_applied());

        assert_eq!(
            coordinator.register("door", 9).unwrap(),
            Registration::Existing {
                id: 5,
                state: AlarmState::Thrown
            }
        );
        assert_eq!(coordinator.status("door"), Some(AlarmState::Thrown));
    }

    #[test]
    fn concurrent_register_same_alarm() {
        let (_, _, coordinator) = setup();
        let results: Vec<Registration> = thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| coordinator.register("A", 5).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let created = results.iter().filter(|r| **r == Registration::Created).count();
        assert_eq!(created, 1);
        assert_eq!(
            coordinator.alarms(),
            vec![AlarmRecord::new("A", 5, AlarmState::Recovered)]
        );
    }

    #[test]
    fn concurrent_register_distinct_alarms() {
        let (_, _, coordinator) = setup();
        thread::scope(|s| {
            for t in 0..8 {
                let coordinator = &coordinator;
                s.spawn(move || {
                    for i in 0..10 {
                        coordinator.register(&format!("alarm-{t}-{i}"), t * 10 + i).unwrap();
                    }
                });
            }
        });
        assert_eq!(coordinator.alarms().len(), 80);
    }

    // ---- Transitions ----

    #[test]
    fn transition_unknown_alarm() {
        let (store, notifier, coordinator) = setup();
        assert_eq!(coordinator.throw("ghost"), TransitionOutcome::NotFound);
        assert_eq!(notifier.attempts(), 0);
        assert_eq!(store.upsert_count(), 0);
    }

    #[test]
    fn full_success_converges_all_three_views() {
        let (store, notifier, coordinator) = setup();
        coordinator.register("door", 7).unwrap();

        assert_eq!(coordinator.throw("door"), TransitionOutcome::Applied);
        assert_eq!(coordinator.status("door"), Some(AlarmState::Thrown));
        assert_eq!(
            store.get("door"),
            Some(AlarmRecord::new("door", 7, AlarmState::Thrown))
        );
        let delivery = &notifier.deliveries()[0];
        assert_eq!((delivery.code, delivery.payload), (1, 7));
        assert_eq!(delivery.recipient, "monitor");
        assert_eq!(delivery.topic, "alarm.state");

        assert_eq!(coordinator.recover("door"), TransitionOutcome::Applied);
        assert_eq!(notifier.deliveries()[1].code, 0);
        assert_eq!(coordinator.status("door"), Some(AlarmState::Recovered));
    }

    #[test]
    fn refused_notification_changes_nothing() {
        let store = Arc::new(InMemoryAlarmStore::new());
        let notifier = Arc::new(RecordingNotifier::refusing());
        let coordinator =
            AlarmCoordinator::open(store.clone(), notifier.clone(), CoordinatorConfig::default())
                .unwrap();
        coordinator.register("door", 7).unwrap();
        let upserts = store.upsert_count();

        assert_eq!(coordinator.throw("door"), TransitionOutcome::NotDelivered);
        assert_eq!(coordinator.status("door"), Some(AlarmState::Recovered));
        assert_eq!(store.upsert_count(), upserts);
        assert_eq!(notifier.attempts(), 1);
        assert!(notifier.deliveries().is_empty());
    }

    #[test]
    fn store_failure_leaves_memory_advanced() {
        let (store, _, coordinator) = setup();
        coordinator.register("door", 7).unwrap();
        store.fail_next_upsert();

        assert_eq!(coordinator.throw("door"), TransitionOutcome::NotPersisted);
        assert_eq!(coordinator.status("door"), Some(AlarmState::Thrown));
        assert_eq!(
            store.get("door"),
            Some(AlarmRecord::new("door", 7, AlarmState::Recovered))
        );
    }

    #[test]
    fn reasserting_current_state_still_notifies() {
        let (_, notifier, coordinator) = setup();
        coordinator.register("door", 7).unwrap();
        assert!(coordinator.recover("door").is_applied());
        assert_eq!(notifier.deliveries().len(), 1);
    }

    #[test]
    fn concurrent_transitions_have_one_winner() {
        let store = Arc::new(InMemoryAlarmStore::new());
        let notifier = Arc::new(BarrierNotifier {
            barrier: Barrier::new(2),
            inner: RecordingNotifier::new(),
        });
        let coordinator =
            AlarmCoordinator::open(store, notifier.clone(), CoordinatorConfig::default()).unwrap();
        coordinator.register("door", 7).unwrap();

        // Both calls observe the same prior state before either swaps.
        let outcomes = thread::scope(|s| {
            let a = s.spawn(|| coordinator.throw("door"));
            let b = s.spawn(|| coordinator.throw("door"));
            [a.join().unwrap(), b.join().unwrap()]
        });

        let applied = outcomes.iter().filter(|o| o.is_applied()).count();
        let lost = outcomes
            .iter()
            .filter(|o| **o == TransitionOutcome::LostRace)
            .count();
        assert_eq!((applied, lost), (1, 1));
        assert_eq!(notifier.inner.attempts(), 2);
        assert_eq!(coordinator.status("door"), Some(AlarmState::Thrown));
    }
}
