//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine's storage, eviction and expiry rules.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CachedValue, ConcurrentStore, EvictionEngine, EvictionPolicy, ExpiryPolicy, Store};

// == Test Configuration ==
const TEST_MAX_ENTRIES: u64 = 50;

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Invalidate { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Invalidate { key }),
    ]
}

// == Helpers ==
fn unbounded() -> Store<String> {
    Store::new(EvictionPolicy::default(), None, None)
}

fn sized(maximum_size: u64) -> Store<String> {
    Store::new(
        EvictionPolicy {
            maximum_size: Some(maximum_size),
            ..Default::default()
        },
        None,
        None,
    )
}

fn text(value: String) -> CachedValue {
    Arc::new(value)
}

fn as_text(value: &CachedValue) -> String {
    value.downcast_ref::<String>().cloned().unwrap_or_default()
}

fn unique(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|key| seen.insert(key.clone())).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a value and reading it back before expiry returns that value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = unbounded();
        let now = Instant::now();

        store.insert(key.clone(), text(value.clone()), now);

        let retrieved = store.get(&key, now);
        prop_assert!(retrieved.is_some(), "Stored key should be present");
        prop_assert_eq!(as_text(&retrieved.unwrap()), value, "Round-trip value mismatch");
    }

    // After removal a key reads as absent.
    #[test]
    fn prop_remove_makes_absent(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = unbounded();
        let now = Instant::now();

        store.insert(key.clone(), text(value), now);
        prop_assert!(store.remove(&key).is_some(), "Key should exist before removal");
        prop_assert!(store.get(&key, now).is_none(), "Key should not exist after removal");
    }

    // Writing V1 then V2 under the same key leaves exactly one entry, V2.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let mut store = unbounded();
        let now = Instant::now();

        store.insert(key.clone(), text(value1), now);
        store.insert(key.clone(), text(value2.clone()), now);

        prop_assert_eq!(as_text(&store.get(&key, now).unwrap()), value2);
        prop_assert_eq!(store.len(), 1, "Should have exactly one entry after overwrite");
    }

    // No sequence of writes grows the store past its maximum size.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let mut store = sized(TEST_MAX_ENTRIES);
        let now = Instant::now();

        for (key, value) in entries {
            store.insert(key, text(value), now);
            prop_assert!(
                store.len() as u64 <= TEST_MAX_ENTRIES,
                "Cache size {} exceeds max {}",
                store.len(),
                TEST_MAX_ENTRIES
            );
        }
    }

    // Total weight never exceeds the maximum weight, and matches the live entries.
    #[test]
    fn prop_weight_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..100),
        maximum_weight in 0u64..2000
    ) {
        let policy = EvictionPolicy {
            maximum_weight: Some(maximum_weight),
            ..Default::default()
        };
        let weigher: crate::cache::Weigher<String> =
            Arc::new(|_: &String, value: &CachedValue| as_text(value).len() as u64);
        let mut store = Store::new(policy, None, Some(weigher));
        let now = Instant::now();

        for (key, value) in entries {
            store.insert(key, text(value), now);
            prop_assert!(store.total_weight() <= maximum_weight);
        }
    }

    // Expired entries are never returned; live ones are.
    #[test]
    fn prop_write_expiry_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in 1u64..10_000,
        elapsed_ms in 0u64..20_000
    ) {
        let policy = EvictionPolicy {
            expiry: ExpiryPolicy { after_access: None, after_write: Some(Duration::from_millis(ttl_ms)) },
            ..Default::default()
        };
        let mut store = Store::new(policy, None, None);
        let now = Instant::now();

        store.insert(key.clone(), text(value), now);
        let found = store.get(&key, now + Duration::from_millis(elapsed_ms)).is_some();

        prop_assert_eq!(found, elapsed_ms < ttl_ms);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Filling to capacity and adding one more evicts the least recently written key.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::vec(valid_key_strategy(), 3..10),
        new_key in valid_key_strategy(),
        new_value in valid_value_strategy()
    ) {
        let unique_keys = unique(initial_keys);
        prop_assume!(unique_keys.len() >= 2);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len() as u64;
        let mut store = sized(capacity);
        let now = Instant::now();

        for key in &unique_keys {
            store.insert(key.clone(), text(format!("value_{}", key)), now);
        }
        prop_assert_eq!(store.len() as u64, capacity, "Cache should be at capacity");

        store.insert(new_key.clone(), text(new_value), now);

        prop_assert_eq!(store.len() as u64, capacity);
        prop_assert!(store.get(&unique_keys[0], now).is_none(), "Oldest key should have been evicted");
        prop_assert!(store.get(&new_key, now).is_some(), "New key should exist after insertion");
        for key in unique_keys.iter().skip(1) {
            prop_assert!(store.get(key, now).is_some(), "Key '{}' should still exist", key);
        }
    }

    // A read makes a key most recently used, so it is not the next eviction.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(valid_key_strategy(), 3..8),
        new_key in valid_key_strategy(),
        new_value in valid_value_strategy()
    ) {
        let unique_keys = unique(keys);
        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let mut store = sized(unique_keys.len() as u64);
        let now = Instant::now();

        for key in &unique_keys {
            store.insert(key.clone(), text(format!("value_{}", key)), now);
        }

        let accessed_key = unique_keys[0].clone();
        prop_assert!(store.get(&accessed_key, now).is_some());
        let expected_evicted = unique_keys[1].clone();

        store.insert(new_key.clone(), text(new_value), now);

        prop_assert!(store.get(&accessed_key, now).is_some(), "Accessed key should not be evicted");
        prop_assert!(store.get(&expected_evicted, now).is_none(), "Oldest key after access should be evicted");
        prop_assert!(store.get(&new_key, now).is_some(), "New key should exist");
    }
}

// == Concurrent Operation Correctness ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Concurrent reads only ever observe complete values written for that key,
    // and the store stays within its bounds.
    #[test]
    fn prop_concurrent_operation_correctness(
        operations in prop::collection::vec(cache_op_strategy(), 10..60)
    ) {
        let store: Arc<ConcurrentStore<String>> = Arc::new(ConcurrentStore::new(
            EvictionPolicy { maximum_size: Some(TEST_MAX_ENTRIES), ..Default::default() },
            None,
            None,
        ));

        let handles: Vec<_> = operations
            .chunks(5)
            .map(|chunk| {
                let store = Arc::clone(&store);
                let chunk = chunk.to_vec();
                std::thread::spawn(move || -> Result<(), String> {
                    for op in chunk {
                        match op {
                            CacheOp::Put { key, value } => {
                                store.put(key.clone(), text(format!("{}={}", key, value)));
                            }
                            CacheOp::Get { key } => {
                                if let Some(value) = store.get_if_present(&key) {
                                    let value = as_text(&value);
                                    if !value.starts_with(&format!("{}=", key)) {
                                        return Err(format!("Key '{}' read foreign value '{}'", key, value));
                                    }
                                }
                            }
                            CacheOp::Invalidate { key } => store.invalidate(&key),
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            let result = handle.join().expect("Thread should not panic");
            prop_assert!(result.is_ok(), "Concurrent operation failed: {:?}", result);
        }

        prop_assert!(store.len() as u64 <= TEST_MAX_ENTRIES, "Cache should not exceed max entries");
    }
}
