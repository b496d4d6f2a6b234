//! Sync Cache - named, configuration-driven in-memory caches
//!
//! Each [`SyncCache`] is built from one [`CacheConfiguration`] on top of its
//! own eviction engine (TTL expiration, LRU eviction by size or weight), and
//! adds typed retrieval through a shared [`ConversionService`] plus atomic
//! compute-on-miss.

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod sync_cache;

pub use cache::{CacheKey, CachedValue, ConcurrentStore, EvictionEngine, StoreBuilder};
pub use config::CacheConfiguration;
pub use convert::{ConversionService, DefaultConversionService, TargetType};
pub use error::{CacheError, Result};
pub use sync_cache::SyncCache;
