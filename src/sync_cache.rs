//! Sync Cache Module
//!
//! A named cache built from one [`CacheConfiguration`]. Reads and writes go
//! to the eviction engine; typed access goes through the shared conversion
//! service.

use std::any::{type_name, Any};
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::cache::{CacheKey, CachedValue, ConcurrentStore, EvictionEngine, StoreBuilder};
use crate::config::CacheConfiguration;
use crate::convert::{ConversionService, TargetType};
use crate::error::{CacheError, Result};

// == Sync Cache ==
/// A named, synchronous cache with typed retrieval and compute-on-miss.
///
/// One instance exists per named configuration and owns its own engine;
/// engines are never shared between caches. The conversion service is
/// shared by all of them.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sync_cache::{CacheConfiguration, DefaultConversionService, SyncCache};
///
/// let config = CacheConfiguration::new("users").with_expire_after_write(Duration::from_secs(60));
/// let cache: SyncCache<u64> =
///     SyncCache::new(Arc::new(config), Arc::new(DefaultConversionService::new())).unwrap();
///
/// cache.put(1, Some("alice".to_string()));
/// assert_eq!(cache.get::<String>(&1), Some("alice".to_string()));
/// ```
pub struct SyncCache<K, E = ConcurrentStore<K>> {
    configuration: Arc<CacheConfiguration>,
    cache: E,
    conversion_service: Arc<dyn ConversionService>,
    _key: PhantomData<fn() -> K>,
}

impl<K: CacheKey> SyncCache<K> {
    // == Constructors ==
    /// Validates `configuration` and builds its engine.
    pub fn new(
        configuration: Arc<CacheConfiguration>,
        conversion_service: Arc<dyn ConversionService>,
    ) -> Result<Self> {
        configuration.validate()?;
        let cache = Self::build_cache(&configuration).build();
        Ok(Self::with_engine(configuration, conversion_service, cache))
    }

    /// Like [`new`](Self::new), charging each entry the weight `weigher`
    /// computes against the configured maximum weight.
    pub fn with_weigher<F>(
        configuration: Arc<CacheConfiguration>,
        conversion_service: Arc<dyn ConversionService>,
        weigher: F,
    ) -> Result<Self>
    where
        F: Fn(&K, &CachedValue) -> u64 + Send + Sync + 'static,
    {
        configuration.validate()?;
        let cache = Self::build_cache(&configuration).weigher(weigher).build();
        Ok(Self::with_engine(configuration, conversion_service, cache))
    }

    // == Build Cache ==
    /// Translates each knob present in `configuration` into the matching
    /// engine setting. Absent knobs keep the engine default.
    pub fn build_cache(configuration: &CacheConfiguration) -> StoreBuilder<K> {
        info!(
            "Building cache '{}': expire_after_access={:?}, expire_after_write={:?}, initial_capacity={:?}, maximum_size={:?}, maximum_weight={:?}",
            configuration.name(),
            configuration.expire_after_access(),
            configuration.expire_after_write(),
            configuration.initial_capacity(),
            configuration.maximum_size(),
            configuration.maximum_weight()
        );

        let mut builder = StoreBuilder::new();
        if let Some(duration) = configuration.expire_after_access() {
            builder = builder.expire_after_access(duration);
        }
        if let Some(duration) = configuration.expire_after_write() {
            builder = builder.expire_after_write(duration);
        }
        if let Some(capacity) = configuration.initial_capacity() {
            builder = builder.initial_capacity(capacity);
        }
        if let Some(size) = configuration.maximum_size() {
            builder = builder.maximum_size(size);
        }
        if let Some(weight) = configuration.maximum_weight() {
            builder = builder.maximum_weight(weight);
        }
        builder
    }
}

impl<K: CacheKey, E: EvictionEngine<K>> SyncCache<K, E> {
    /// Wraps an already built engine. The engine is used as is; the
    /// configuration only supplies the name.
    pub fn with_engine(
        configuration: Arc<CacheConfiguration>,
        conversion_service: Arc<dyn ConversionService>,
        cache: E,
    ) -> Self {
        Self {
            configuration,
            cache,
            conversion_service,
            _key: PhantomData,
        }
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        self.configuration.name()
    }

    /// The underlying engine, for callers that need direct access.
    pub fn native_cache(&self) -> &E {
        &self.cache
    }

    pub fn configuration(&self) -> &Arc<CacheConfiguration> {
        &self.configuration
    }

    // == Get ==
    /// Returns the value stored for `key` converted to `T`.
    ///
    /// A missing key and a value that cannot be converted to `T` both
    /// return `None`.
    pub fn get<T>(&self, key: &K) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.cache.get_if_present(key) {
            Some(value) => self.convert::<T>(&value),
            None => {
                trace!("Cache '{}' miss", self.name());
                None
            }
        }
    }

    // == Get Or Compute ==
    /// Returns the value for `key` converted to `T`, running `supplier` and
    /// storing its result if the key is absent.
    ///
    /// Concurrent callers missing on the same key run the supplier once
    /// between them and all observe the value it produced. A supplier
    /// returning `None` stores nothing and yields `Ok(None)`.
    ///
    /// The supplier must not call back into this cache for the same key;
    /// it would wait on itself.
    ///
    /// # Errors
    /// [`CacheError::UnconvertibleValue`] if the value cannot be converted
    /// to `T`. Retrying will not help: the supplier and `T` do not match.
    pub fn get_or_compute<T, V, F>(&self, key: K, supplier: F) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
        F: FnOnce() -> Option<V>,
    {
        let value = self.cache.get_or_compute(key, || {
            trace!("Cache '{}' loading value", self.name());
            supplier().map(|value| Arc::new(value) as CachedValue)
        });

        match value {
            Some(value) => match self.convert::<T>(&value) {
                Some(converted) => Ok(Some(converted)),
                None => {
                    warn!(
                        "Cache '{}' supplier produced a value not convertible to {}",
                        self.name(),
                        type_name::<T>()
                    );
                    Err(CacheError::UnconvertibleValue {
                        type_name: type_name::<T>(),
                    })
                }
            },
            None => Ok(None),
        }
    }

    // == Put ==
    /// Stores `value` for `key`, replacing any previous value and restarting
    /// its write expiry. Storing `None` removes the key.
    pub fn put<V>(&self, key: K, value: Option<V>)
    where
        V: Send + Sync + 'static,
    {
        match value {
            Some(value) => self.cache.put(key, Arc::new(value)),
            None => self.cache.invalidate(&key),
        }
    }

    // == Put If Absent ==
    /// Stores `value` unless a value convertible to `V` is already present,
    /// in which case that value is returned and nothing is written.
    ///
    /// The read and the write are separate engine operations: two callers
    /// racing on an absent key may both write, and the last write wins.
    /// Use [`get_or_compute`](Self::get_or_compute) when that matters.
    pub fn put_if_absent<V>(&self, key: K, value: V) -> Option<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        if let Some(existing) = self.get::<V>(&key) {
            return Some(existing);
        }
        self.put(key, Some(value));
        None
    }

    // == Invalidate ==
    pub fn invalidate(&self, key: &K) {
        self.cache.invalidate(key);
    }

    pub fn invalidate_all(&self) {
        debug!("Invalidating all entries of cache '{}'", self.name());
        self.cache.invalidate_all();
    }

    fn convert<T: Any + Clone>(&self, value: &CachedValue) -> Option<T> {
        let converted = self
            .conversion_service
            .convert(value, &TargetType::of::<T>())?;
        converted.downcast_ref::<T>().cloned()
    }
}
