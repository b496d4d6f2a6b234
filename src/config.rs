//! Configuration Module
//!
//! Describes one named cache and its tuning knobs. Every knob is optional;
//! an unset knob leaves the engine's default policy for that dimension alone.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Configuration for a single named cache.
///
/// Built once, then shared (usually as `Arc<CacheConfiguration>`) with the
/// cache that owns it. There are no setters taking `&mut self`: a configuration
/// is immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfiguration {
    /// Cache name, unique per cache instance
    name: String,
    /// Evict entries not read or written for this long
    #[serde(default, with = "duration_ms", skip_serializing_if = "Option::is_none")]
    expire_after_access: Option<Duration>,
    /// Evict entries this long after their last write
    #[serde(default, with = "duration_ms", skip_serializing_if = "Option::is_none")]
    expire_after_write: Option<Duration>,
    /// Initial storage sizing hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initial_capacity: Option<usize>,
    /// Upper bound on the number of entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    maximum_size: Option<u64>,
    /// Upper bound on the total weight of all entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    maximum_weight: Option<u64>,
}

impl CacheConfiguration {
    // == Constructor ==
    /// Creates a configuration with the given name and no knobs set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expire_after_access: None,
            expire_after_write: None,
            initial_capacity: None,
            maximum_size: None,
            maximum_weight: None,
        }
    }

    // == Builders ==
    pub fn with_expire_after_access(mut self, duration: Duration) -> Self {
        self.expire_after_access = Some(duration);
        self
    }

    pub fn with_expire_after_write(mut self, duration: Duration) -> Self {
        self.expire_after_write = Some(duration);
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    pub fn with_maximum_size(mut self, size: u64) -> Self {
        self.maximum_size = Some(size);
        self
    }

    /// Bounds the total weight of the cache. Not checked against
    /// `maximum_size`; setting both applies both.
    pub fn with_maximum_weight(mut self, weight: u64) -> Self {
        self.maximum_weight = Some(weight);
        self
    }

    // == From Env ==
    /// Loads the knobs for `name` from environment variables.
    ///
    /// # Environment Variables
    /// With `NAME` being `name` upper-cased and `-`/`.` replaced by `_`:
    /// - `CACHE_NAME_EXPIRE_AFTER_ACCESS_MS` - access expiry in milliseconds
    /// - `CACHE_NAME_EXPIRE_AFTER_WRITE_MS` - write expiry in milliseconds
    /// - `CACHE_NAME_INITIAL_CAPACITY` - initial capacity hint
    /// - `CACHE_NAME_MAXIMUM_SIZE` - maximum entry count
    /// - `CACHE_NAME_MAXIMUM_WEIGHT` - maximum total weight
    ///
    /// Missing or unparseable variables leave the knob unset.
    pub fn from_env(name: impl Into<String>) -> Self {
        let name = name.into();
        let prefix = env_prefix(&name);
        let var = |suffix: &str| env::var(format!("{}_{}", prefix, suffix)).ok();

        Self {
            expire_after_access: var("EXPIRE_AFTER_ACCESS_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            expire_after_write: var("EXPIRE_AFTER_WRITE_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            initial_capacity: var("INITIAL_CAPACITY").and_then(|v| v.parse().ok()),
            maximum_size: var("MAXIMUM_SIZE").and_then(|v| v.parse().ok()),
            maximum_weight: var("MAXIMUM_WEIGHT").and_then(|v| v.parse().ok()),
            name,
        }
    }

    // == Validate ==
    /// Rejects configurations no engine can be built from.
    ///
    /// A zero maximum size or weight is legal and means "hold nothing".
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CacheError::InvalidConfiguration(
                "cache name must not be empty".to_string(),
            ));
        }
        if self.initial_capacity == Some(0) {
            return Err(CacheError::InvalidConfiguration(format!(
                "initial capacity of cache '{}' must be positive",
                self.name
            )));
        }
        Ok(())
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expire_after_access(&self) -> Option<Duration> {
        self.expire_after_access
    }

    pub fn expire_after_write(&self) -> Option<Duration> {
        self.expire_after_write
    }

    pub fn initial_capacity(&self) -> Option<usize> {
        self.initial_capacity
    }

    pub fn maximum_size(&self) -> Option<u64> {
        self.maximum_size
    }

    pub fn maximum_weight(&self) -> Option<u64> {
        self.maximum_weight
    }
}

fn env_prefix(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    format!("CACHE_{}", normalized)
}

/// Durations travel as whole milliseconds. A fractional millisecond rounds
/// up, so a nonzero TTL never becomes zero.
mod duration_ms {
    use std::time::Duration;

    use serde::ser::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                let millis = u64::try_from(duration.as_nanos().div_ceil(1_000_000))
                    .map_err(|_| S::Error::custom(format!("duration {:?} overflows u64 milliseconds", duration)))?;
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
