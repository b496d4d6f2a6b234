//! Cache Store Module
//!
//! Single-threaded cache core combining HashMap storage with access-order
//! and write-order tracking. `ConcurrentStore` wraps it behind a lock.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, trace};

use crate::cache::{CacheEntry, CacheKey, CachedValue, ExpiryPolicy, LruTracker, Weigher};

// == Eviction Policy ==
/// Everything that decides which entries survive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub expiry: ExpiryPolicy,
    /// Upper bound on entry count
    pub maximum_size: Option<u64>,
    /// Upper bound on total weight
    pub maximum_weight: Option<u64>,
}

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
pub struct Store<K> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry>,
    /// Keys by last read or write, for LRU eviction and access expiry
    access_order: LruTracker<K>,
    /// Keys by last write, for write expiry
    write_order: LruTracker<K>,
    policy: EvictionPolicy,
    /// None weighs every entry as 1
    weigher: Option<Weigher<K>>,
    total_weight: u64,
}

impl<K: CacheKey> Store<K> {
    // == Constructor ==
    pub fn new(policy: EvictionPolicy, initial_capacity: Option<usize>, weigher: Option<Weigher<K>>) -> Self {
        let capacity = initial_capacity.unwrap_or(0);
        Self {
            entries: HashMap::with_capacity(capacity),
            access_order: LruTracker::with_capacity(capacity),
            write_order: LruTracker::with_capacity(capacity),
            policy,
            weigher,
            total_weight: 0,
        }
    }

    // == Get ==
    /// Retrieves a live value and records the access.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<CachedValue> {
        let expired = self.entries.get(key)?.is_expired(&self.policy.expiry, now);
        if expired {
            self.remove(key);
            trace!("Removed expired entry on read");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        let value = entry.value.clone();
        self.access_order.touch(key);
        Some(value)
    }

    // == Insert ==
    /// Stores a value, overwriting any previous one and resetting both of
    /// its TTL timestamps, then evicts down to the size and weight bounds.
    ///
    /// Returns the number of entries evicted for capacity.
    pub fn insert(&mut self, key: K, value: CachedValue, now: Instant) -> usize {
        self.cleanup_expired(now);

        let weight = match &self.weigher {
            Some(weigher) => weigher(&key, &value),
            None => 1,
        };

        self.access_order.touch(&key);
        self.write_order.touch(&key);
        if let Some(previous) = self.entries.insert(key, CacheEntry::new(value, weight, now)) {
            self.total_weight = self.total_weight.saturating_sub(previous.weight);
        }
        self.total_weight = self.total_weight.saturating_add(weight);

        self.evict_to_capacity()
    }

    // == Remove ==
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.access_order.remove(key);
        self.write_order.remove(key);
        self.total_weight = self.total_weight.saturating_sub(entry.weight);
        Some(entry)
    }

    // == Clear ==
    /// Removes every entry. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.access_order.clear();
        self.write_order.clear();
        self.total_weight = 0;
        count
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Both trackers are ordered by the timestamp their deadline is measured
    /// from, so only their expired prefixes are visited.
    pub fn cleanup_expired(&mut self, now: Instant) -> usize {
        let expiry = self.policy.expiry;
        if expiry.is_unbounded() {
            return 0;
        }

        let mut removed = 0;
        if expiry.after_access.is_some() {
            while let Some(key) = self.access_order.peek_oldest() {
                match self.entries.get(key) {
                    Some(entry) if entry.is_access_expired(&expiry, now) => {}
                    _ => break,
                }
                let key = key.clone();
                self.remove(&key);
                removed += 1;
            }
        }
        if expiry.after_write.is_some() {
            while let Some(key) = self.write_order.peek_oldest() {
                match self.entries.get(key) {
                    Some(entry) if entry.is_write_expired(&expiry, now) => {}
                    _ => break,
                }
                let key = key.clone();
                self.remove(&key);
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Expired {} entries", removed);
        }
        removed
    }

    // == Evict To Capacity ==
    fn evict_to_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.is_over_capacity() {
            match self.access_order.evict_oldest() {
                Some(key) => {
                    if let Some(entry) = self.entries.remove(&key) {
                        self.total_weight = self.total_weight.saturating_sub(entry.weight);
                    }
                    self.write_order.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        if evicted > 0 {
            debug!("Evicted {} entries over capacity", evicted);
        }
        evicted
    }

    fn is_over_capacity(&self) -> bool {
        let over_size = self
            .policy
            .maximum_size
            .is_some_and(|maximum| self.entries.len() as u64 > maximum);
        let over_weight = self
            .policy
            .maximum_weight
            .is_some_and(|maximum| self.total_weight > maximum);
        over_size || over_weight
    }

    // == Accessors ==
    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }
}
