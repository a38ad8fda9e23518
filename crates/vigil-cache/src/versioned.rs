//! The [`VersionedCache`] and its single-attempt insert result [`TryAdd`].

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::trace;

/// Outcome of a single insert attempt via [`VersionedCache::try_add`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryAdd<V> {
    /// The value was installed; this call's compare-and-swap committed.
    Inserted(V),
    /// The key was already present. Carries the existing value.
    Exists(V),
    /// Another writer replaced the snapshot between read and swap. The
    /// candidate is handed back so the caller can retry with it.
    Contended(V),
}

/// Lock-free, insert-only cache over an immutable snapshot.
///
/// The whole key/value set lives in one `Arc<HashMap>`. Readers load the
/// current snapshot and never block. Writers copy the snapshot, add one pair,
/// and publish the copy with a compare-and-swap on the shared reference; a
/// failed swap means another writer made progress, so the loop is lock-free.
///
/// Once a key is visible its value does not change until [`clear`] swaps in
/// an empty snapshot.
///
/// [`clear`]: VersionedCache::clear
pub struct VersionedCache<K, V> {
    snapshot: ArcSwap<HashMap<K, V>>,
}

impl<K, V> VersionedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Return the value for `key`, computing and installing it on a miss.
    ///
    /// `factory` runs at most once per call, and only on a miss. Callers
    /// racing on the same key may each run their factory, but only the value
    /// whose swap commits first is ever observed; the others are discarded
    /// and their callers return the winner's value.
    pub fn get_or_add<F>(&self, key: K, factory: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.snapshot.load().get(&key) {
            return value.clone();
        }

        let mut candidate = factory(&key);
        let mut attempts = 0u32;
        loop {
            match self.try_add(key.clone(), candidate) {
                TryAdd::Inserted(value) | TryAdd::Exists(value) => {
                    if attempts > 0 {
                        trace!(attempts, "cache insert settled after contention");
                    }
                    return value;
                }
                TryAdd::Contended(value) => {
                    attempts += 1;
                    candidate = value;
                }
            }
        }
    }

    /// Make one attempt to install `value` under `key`.
    ///
    /// Never overwrites: if `key` is present the existing value is returned
    /// as [`TryAdd::Exists`]. A lost compare-and-swap is reported as
    /// [`TryAdd::Contended`] instead of being retried.
    pub fn try_add(&self, key: K, value: V) -> TryAdd<V> {
        let current = self.snapshot.load_full();
        if let Some(existing) = current.get(&key) {
            return TryAdd::Exists(existing.clone());
        }

        let mut next = HashMap::with_capacity(current.len() + 1);
        next.extend(current.iter().map(|(k, v)| (k.clone(), v.clone())));
        next.insert(key, value.clone());

        let previous = self.snapshot.compare_and_swap(&current, Arc::new(next));
        if Arc::ptr_eq(&*previous, &current) {
            TryAdd::Inserted(value)
        } else {
            TryAdd::Contended(value)
        }
    }

    /// Lock-free lookup against the current snapshot.
    pub fn get(&self, key: &K) -> Option<V> {
        self.snapshot.load().get(key).cloned()
    }

    /// Replace the snapshot with an empty one.
    pub fn clear(&self) {
        self.snapshot.store(Arc::new(HashMap::new()));
    }

    /// Number of entries in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Returns `true` if the current snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// The current snapshot. It stays valid (and unchanged) for as long as
    /// the caller holds it, regardless of later writes.
    pub fn snapshot(&self) -> Arc<HashMap<K, V>> {
        self.snapshot.load_full()
    }
}

impl<K, V> VersionedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    /// Point-in-time scan for `value`.
    pub fn contains_value(&self, value: &V) -> bool {
        self.snapshot.load().values().any(|v| v == value)
    }
}

impl<K, V> Default for VersionedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for VersionedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedCache")
            .field("entries", &self.snapshot.load().len())
            .finish()
    }
}
