//! Store Builder Module
//!
//! Collects eviction knobs and builds a [`ConcurrentStore`] from them.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, CachedValue, ConcurrentStore, EvictionPolicy, ExpiryPolicy, Weigher};

// == Store Builder ==
/// Builder for configuring a [`ConcurrentStore`].
///
/// Every knob is optional; an unset knob leaves that dimension unbounded.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sync_cache::cache::{ConcurrentStore, StoreBuilder};
///
/// let store: ConcurrentStore<String> = StoreBuilder::new()
///     .expire_after_write(Duration::from_secs(60))
///     .maximum_size(10_000)
///     .build();
/// ```
pub struct StoreBuilder<K> {
    expiry: ExpiryPolicy,
    initial_capacity: Option<usize>,
    maximum_size: Option<u64>,
    maximum_weight: Option<u64>,
    weigher: Option<Weigher<K>>,
}

impl<K: CacheKey> StoreBuilder<K> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            expiry: ExpiryPolicy::default(),
            initial_capacity: None,
            maximum_size: None,
            maximum_weight: None,
            weigher: None,
        }
    }

    // == Knobs ==
    /// Expire entries not read or written for `duration`.
    pub fn expire_after_access(mut self, duration: Duration) -> Self {
        self.expiry.after_access = Some(duration);
        self
    }

    /// Expire entries `duration` after their last write, regardless of reads.
    pub fn expire_after_write(mut self, duration: Duration) -> Self {
        self.expiry.after_write = Some(duration);
        self
    }

    /// Pre-size internal tables for `capacity` entries.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Evict least recently used entries beyond `size` entries.
    pub fn maximum_size(mut self, size: u64) -> Self {
        self.maximum_size = Some(size);
        self
    }

    /// Evict least recently used entries while the total weight exceeds `weight`.
    ///
    /// Without a [`weigher`](Self::weigher) every entry weighs 1.
    pub fn maximum_weight(mut self, weight: u64) -> Self {
        self.maximum_weight = Some(weight);
        self
    }

    /// Set the function computing each entry's weight.
    pub fn weigher<F>(mut self, weigher: F) -> Self
    where
        F: Fn(&K, &CachedValue) -> u64 + Send + Sync + 'static,
    {
        self.weigher = Some(Arc::new(weigher));
        self
    }

    /// Returns the policy the built store will enforce.
    pub fn policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            expiry: self.expiry,
            maximum_size: self.maximum_size,
            maximum_weight: self.maximum_weight,
        }
    }

    // == Build ==
    /// Build the store with the configured settings.
    pub fn build(self) -> ConcurrentStore<K> {
        let policy = self.policy();
        ConcurrentStore::new(policy, self.initial_capacity, self.weigher)
    }
}

impl<K: CacheKey> Default for StoreBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}
