//! Eviction Engine Module
//!
//! The engine contract named caches are built on, and the thread-safe
//! store that implements it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::cache::{CacheKey, CachedValue, EvictionPolicy, Store, Weigher};

// == Eviction Engine ==
/// A concurrent key/value store that evicts entries on its own.
///
/// Implementations must be safe to share across threads. `get_or_compute`
/// must run its loader at most once per key per miss: concurrent callers
/// on the same missing key wait for the one running loader, while callers
/// on other keys never wait on it.
pub trait EvictionEngine<K>: Send + Sync {
    /// Returns the live value for `key`, if any.
    fn get_if_present(&self, key: &K) -> Option<CachedValue>;

    /// Returns the live value for `key`, or runs `loader`, stores what it
    /// returns and hands that back. A loader returning `None` stores nothing.
    fn get_or_compute<F>(&self, key: K, loader: F) -> Option<CachedValue>
    where
        F: FnOnce() -> Option<CachedValue>;

    /// Stores `value`, replacing any previous value for `key`.
    fn put(&self, key: K, value: CachedValue);

    /// Removes `key`. No-op if absent.
    fn invalidate(&self, key: &K);

    /// Removes every entry.
    fn invalidate_all(&self);

    /// Approximate number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds the value produced by the one loader running for a key.
type LoadSlot = Arc<Mutex<Option<CachedValue>>>;

// == Concurrent Store ==
/// Thread-safe [`Store`] with per-key loading.
///
/// Reads and writes take one short lock on the store. Loaders run outside
/// that lock, serialized per key through a table of load slots.
pub struct ConcurrentStore<K> {
    store: Mutex<Store<K>>,
    /// Load slots of keys with a loader in flight
    loading: Mutex<HashMap<K, LoadSlot>>,
}

impl<K: CacheKey> ConcurrentStore<K> {
    // == Constructor ==
    pub fn new(policy: EvictionPolicy, initial_capacity: Option<usize>, weigher: Option<Weigher<K>>) -> Self {
        Self {
            store: Mutex::new(Store::new(policy, initial_capacity, weigher)),
            loading: Mutex::new(HashMap::new()),
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries now rather than lazily.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        self.store.lock().cleanup_expired(Instant::now())
    }

    pub fn policy(&self) -> EvictionPolicy {
        *self.store.lock().policy()
    }

    pub fn weighted_size(&self) -> u64 {
        self.store.lock().total_weight()
    }

    fn load_slot(&self, key: &K) -> LoadSlot {
        let mut loading = self.loading.lock();
        Arc::clone(
            loading
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None))),
        )
    }
}

impl<K: CacheKey> EvictionEngine<K> for ConcurrentStore<K> {
    fn get_if_present(&self, key: &K) -> Option<CachedValue> {
        self.store.lock().get(key, Instant::now())
    }

    fn get_or_compute<F>(&self, key: K, loader: F) -> Option<CachedValue>
    where
        F: FnOnce() -> Option<CachedValue>,
    {
        if let Some(value) = self.get_if_present(&key) {
            return Some(value);
        }

        loop {
            let slot = self.load_slot(&key);
            // Only one caller per slot gets past this point at a time
            let mut load = LoadGuard::lock(&self.loading, &key, &slot);
            if let Some(value) = load.loaded.as_ref() {
                trace!("Observed value loaded by a concurrent caller");
                return Some(Arc::clone(value));
            }
            if !load.is_registered() {
                trace!("Load slot released without a value, registering again");
                continue;
            }
            if let Some(value) = self.get_if_present(&key) {
                return Some(value);
            }

            let value = loader()?;
            self.put(key.clone(), Arc::clone(&value));
            *load.loaded = Some(Arc::clone(&value));
            return Some(value);
        }
    }

    fn put(&self, key: K, value: CachedValue) {
        self.store.lock().insert(key, value, Instant::now());
    }

    fn invalidate(&self, key: &K) {
        self.store.lock().remove(key);
    }

    fn invalidate_all(&self) {
        let removed = self.store.lock().clear();
        debug!("Invalidated {} entries", removed);
    }

    fn len(&self) -> usize {
        self.store.lock().len()
    }
}

/// Holds a load slot's lock and unregisters the slot when its caller
/// finishes, including by panic.
///
/// The slot leaves the table while its lock is still held, so a waiter
/// that acquires it next either sees the loaded value or finds it
/// unregistered and queues on the key's current slot. A loader therefore
/// only ever runs on the registered slot.
struct LoadGuard<'a, K: CacheKey> {
    loading: &'a Mutex<HashMap<K, LoadSlot>>,
    key: &'a K,
    slot: &'a LoadSlot,
    loaded: MutexGuard<'a, Option<CachedValue>>,
}

impl<'a, K: CacheKey> LoadGuard<'a, K> {
    fn lock(loading: &'a Mutex<HashMap<K, LoadSlot>>, key: &'a K, slot: &'a LoadSlot) -> Self {
        Self {
            loading,
            key,
            slot,
            loaded: slot.lock(),
        }
    }

    fn is_registered(&self) -> bool {
        self.loading
            .lock()
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, self.slot))
    }
}

impl<K: CacheKey> Drop for LoadGuard<'_, K> {
    fn drop(&mut self) {
        let mut loading = self.loading.lock();
        if loading
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, self.slot))
        {
            loading.remove(self.key);
        }
    }
}
