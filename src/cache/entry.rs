//! Cache Entry Module
//!
//! Defines individual cache entries and the two TTL deadlines they obey.

use std::time::{Duration, Instant};

use crate::cache::CachedValue;

// == Expiry Policy ==
/// Time-based eviction knobs. When both are set, whichever deadline
/// elapses first expires the entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryPolicy {
    /// Expire when not read or written for this long
    pub after_access: Option<Duration>,
    /// Expire this long after the last write
    pub after_write: Option<Duration>,
}

impl ExpiryPolicy {
    /// Returns true if no expiry is configured.
    pub fn is_unbounded(&self) -> bool {
        self.after_access.is_none() && self.after_write.is_none()
    }
}

// == Cache Entry ==
/// A single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: CachedValue,
    /// Weight charged against `maximum_weight`
    pub weight: u64,
    /// Time of the last write
    pub written_at: Instant,
    /// Time of the last read or write
    pub accessed_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    pub fn new(value: CachedValue, weight: u64, now: Instant) -> Self {
        Self {
            value,
            weight,
            written_at: now,
            accessed_at: now,
        }
    }

    // == Touch ==
    /// Records a read at `now`.
    pub fn touch(&mut self, now: Instant) {
        self.accessed_at = now;
    }

    // == Is Expired ==
    /// Checks if either deadline has elapsed.
    ///
    /// Boundary condition: an entry is expired once the full TTL has elapsed,
    /// i.e. when `now - timestamp >= ttl`.
    pub fn is_expired(&self, expiry: &ExpiryPolicy, now: Instant) -> bool {
        self.is_access_expired(expiry, now) || self.is_write_expired(expiry, now)
    }

    pub fn is_access_expired(&self, expiry: &ExpiryPolicy, now: Instant) -> bool {
        expiry
            .after_access
            .is_some_and(|ttl| now.saturating_duration_since(self.accessed_at) >= ttl)
    }

    pub fn is_write_expired(&self, expiry: &ExpiryPolicy, now: Instant) -> bool {
        expiry
            .after_write
            .is_some_and(|ttl| now.saturating_duration_since(self.written_at) >= ttl)
    }
}
