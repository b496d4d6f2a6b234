//! Cache Module
//!
//! The concurrent eviction engine behind every named cache: type-erased
//! values, TTL expiration (after access and after write), and LRU eviction
//! under entry-count or weight pressure.

use std::any::Any;
use std::hash::Hash;
use std::sync::Arc;

mod builder;
mod engine;
mod entry;
mod lru;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use builder::StoreBuilder;
pub use engine::{ConcurrentStore, EvictionEngine};
pub use entry::{CacheEntry, ExpiryPolicy};
pub use lru::LruTracker;
pub use store::{EvictionPolicy, Store};

// == Shared Types ==
/// A stored value. Values are opaque to the engine; typed access goes
/// through a conversion service.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Computes the weight of an entry for `maximum_weight` accounting.
pub type Weigher<K> = Arc<dyn Fn(&K, &CachedValue) -> u64 + Send + Sync + 'static>;

/// Bounds every cache key must satisfy. Implemented for all such types.
pub trait CacheKey: Hash + Eq + Clone + Send + Sync + 'static {}

impl<K> CacheKey for K where K: Hash + Eq + Clone + Send + Sync + 'static {}
