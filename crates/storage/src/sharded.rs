//! Sharded storage for scoped memory
//!
//! DashMap keyed by partition, FxHashMap within.
//! Lock-free reads, sharded writes, O(1) lookups.
//!
//! # Design
//!
//! - DashMap: 16-way sharded by default, short read guards
//! - FxHashMap: O(1) lookups, fast non-crypto hash
//! - Per-partition: every scope gets its own shard, so unrelated scopes
//!   never contend on the same map
//!
//! The store holds only live values. Serialization of writers to the same
//! key is the caller's job (see `fabric-concurrency`); the store only
//! guarantees that a reader sees either the old or the new value whole.

use dashmap::DashMap;
use fabric_core::{PartitionId, VersionedValue};
use rustc_hash::FxHashMap;

/// Per-partition shard containing one scope's live values
#[derive(Debug, Default)]
pub struct Shard {
    pub(crate) data: FxHashMap<String, VersionedValue>,
}

impl Shard {
    /// Create a new empty shard
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shard with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Number of live keys in this shard
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Sharded storage - DashMap by partition, HashMap within
///
/// # Thread Safety
///
/// - get(): read guard on one DashMap shard, value cloned out
/// - put(): write guard on the target partition's shard only
/// - Different partitions never contend on the inner map
///
/// # Example
///
/// ```ignore
/// use fabric_storage::ShardedStore;
///
/// let store = ShardedStore::new();
/// store.put(partition, "prefs.theme".into(), versioned);
/// let current = store.get(partition, "prefs.theme");
/// ```
pub struct ShardedStore {
    shards: DashMap<PartitionId, Shard>,
}

impl ShardedStore {
    /// Create new sharded store
    pub fn new() -> Self {
        Self {
            shards: DashMap::new(),
        }
    }

    /// Create with expected number of partitions
    pub fn with_capacity(num_partitions: usize) -> Self {
        Self {
            shards: DashMap::with_capacity(num_partitions),
        }
    }

    /// Number of partitions holding at least one write
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Check if a partition has a shard
    pub fn has_partition(&self, partition: PartitionId) -> bool {
        self.shards.contains_key(&partition)
    }

    /// Total number of live keys across all shards
    pub fn total_entries(&self) -> usize {
        self.shards.iter().map(|entry| entry.value().len()).sum()
    }

    // ========================================================================
    // Get/Put/Delete Operations
    // ========================================================================

    /// Get the current value of a key
    ///
    /// Only the partition's shard is accessed. The clone is taken under the
    /// read guard, so a concurrent put is observed entirely or not at all.
    #[inline]
    pub fn get(&self, partition: PartitionId, key: &str) -> Option<VersionedValue> {
        self.shards
            .get(&partition)
            .and_then(|shard| shard.data.get(key).cloned())
    }

    /// Put a value, returning the value it replaced
    ///
    /// Creates the partition's shard on first write.
    #[inline]
    pub fn put(
        &self,
        partition: PartitionId,
        key: String,
        value: VersionedValue,
    ) -> Option<VersionedValue> {
        self.shards
            .entry(partition)
            .or_insert_with(Shard::new)
            .data
            .insert(key, value)
    }

    /// Delete a key, returning the removed value if it existed
    #[inline]
    pub fn delete(&self, partition: PartitionId, key: &str) -> Option<VersionedValue> {
        self.shards
            .get_mut(&partition)
            .and_then(|mut shard| shard.data.remove(key))
    }

    /// Check if a key exists
    #[inline]
    pub fn contains(&self, partition: PartitionId, key: &str) -> bool {
        self.shards
            .get(&partition)
            .map(|shard| shard.data.contains_key(key))
            .unwrap_or(false)
    }

    /// List live keys of a partition starting with `prefix`, sorted
    pub fn keys_with_prefix(&self, partition: PartitionId, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .shards
            .get(&partition)
            .map(|shard| {
                shard
                    .data
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Get count of live keys for a specific partition
    pub fn partition_entry_count(&self, partition: PartitionId) -> usize {
        self.shards
            .get(&partition)
            .map(|shard| shard.len())
            .unwrap_or(0)
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("shard_count", &self.shard_count())
            .field("total_entries", &self.total_entries())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fabric_core::Value;
    use std::sync::Arc;

    fn versioned(value: impl Into<Value>, version: u64) -> VersionedValue {
        VersionedValue {
            value: value.into(),
            version,
            timestamp: Utc::now(),
        }
    }

    const P1: PartitionId = PartitionId::new(1);
    const P2: PartitionId = PartitionId::new(2);

    #[test]
    fn test_sharded_store_creation() {
        let store = ShardedStore::new();
        assert_eq!(store.shard_count(), 0);
        assert_eq!(store.total_entries(), 0);
    }

    #[test]
    fn test_shard_with_capacity() {
        let shard = Shard::with_capacity(100);
        assert!(shard.is_empty());
        assert_eq!(shard.len(), 0);
    }

    #[test]
    fn test_put_and_get() {
        let store = ShardedStore::new();
        assert!(store.put(P1, "prefs.theme".into(), versioned("dark", 1)).is_none());

        let retrieved = store.get(P1, "prefs.theme").unwrap();
        assert_eq!(retrieved.value, Value::from("dark"));
        assert_eq!(retrieved.version, 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let store = ShardedStore::new();
        assert!(store.get(P1, "missing").is_none());
        assert!(!store.has_partition(P1));
    }

    #[test]
    fn test_put_returns_replaced_value() {
        let store = ShardedStore::new();
        store.put(P1, "counter".into(), versioned(1i64, 1));
        let previous = store.put(P1, "counter".into(), versioned(2i64, 2)).unwrap();

        assert_eq!(previous.value, Value::from(1i64));
        assert_eq!(store.get(P1, "counter").unwrap().version, 2);
    }

    #[test]
    fn test_delete() {
        let store = ShardedStore::new();
        store.put(P1, "to_delete".into(), versioned(42i64, 1));

        let deleted = store.delete(P1, "to_delete").unwrap();
        assert_eq!(deleted.value, Value::from(42i64));
        assert!(store.get(P1, "to_delete").is_none());
        assert!(store.delete(P1, "to_delete").is_none());
    }

    #[test]
    fn test_contains() {
        let store = ShardedStore::new();
        assert!(!store.contains(P1, "exists"));
        store.put(P1, "exists".into(), versioned(true, 1));
        assert!(store.contains(P1, "exists"));
        assert!(!store.contains(P2, "exists"));
    }

    #[test]
    fn test_partitions_isolated() {
        let store = ShardedStore::new();
        store.put(P1, "key".into(), versioned("one", 1));
        store.put(P2, "key".into(), versioned("two", 1));

        assert_eq!(store.get(P1, "key").unwrap().value, Value::from("one"));
        assert_eq!(store.get(P2, "key").unwrap().value, Value::from("two"));
        assert_eq!(store.shard_count(), 2);
    }

    #[test]
    fn test_keys_with_prefix_sorted() {
        let store = ShardedStore::new();
        for key in ["prefs.theme", "prefs.font", "history", "prefs.lang"] {
            store.put(P1, key.into(), versioned(1i64, 1));
        }

        assert_eq!(
            store.keys_with_prefix(P1, "prefs."),
            vec!["prefs.font", "prefs.lang", "prefs.theme"]
        );
        assert_eq!(store.keys_with_prefix(P1, "").len(), 4);
        assert!(store.keys_with_prefix(P2, "").is_empty());
    }

    #[test]
    fn test_debug_impl() {
        let store = ShardedStore::new();
        let debug_str = format!("{:?}", store);
        assert!(debug_str.contains("ShardedStore"));
        assert!(debug_str.contains("shard_count"));
    }

    #[test]
    fn test_concurrent_writes_different_partitions() {
        use std::thread;

        let store = Arc::new(ShardedStore::new());

        let handles: Vec<_> = (0..10u32)
            .map(|p| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let partition = PartitionId::new(p);
                    for i in 0..100i64 {
                        store.put(partition, format!("key.{}", i), versioned(i, i as u64));
                    }
                    partition
                })
            })
            .collect();

        let partitions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for partition in &partitions {
            assert_eq!(store.partition_entry_count(*partition), 100);
        }
        assert_eq!(store.shard_count(), 10);
        assert_eq!(store.total_entries(), 1000);
    }

    #[test]
    fn test_shuffled_writes_keep_last_value() {
        use rand::seq::SliceRandom;

        let store = ShardedStore::new();
        let mut keys: Vec<String> = (0..200).map(|i| format!("k.{}", i)).collect();
        keys.shuffle(&mut rand::thread_rng());

        for (version, key) in keys.iter().enumerate() {
            store.put(P1, key.clone(), versioned(version as i64, version as u64));
        }
        for (version, key) in keys.iter().enumerate() {
            assert_eq!(store.get(P1, key).unwrap().version, version as u64);
        }
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;
        use proptest::prelude::prop;
        use std::collections::BTreeMap;

        #[derive(Debug, Clone)]
        enum Op {
            Put(u8, i64),
            Delete(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..16, any::<i64>()).prop_map(|(k, v)| Op::Put(k, v)),
                (0u8..16).prop_map(Op::Delete),
            ]
        }

        proptest! {
            #[test]
            fn prop_matches_btreemap_model(ops in prop::collection::vec(op(), 0..64)) {
                let store = ShardedStore::new();
                let mut model = BTreeMap::new();

                for (version, op) in ops.into_iter().enumerate() {
                    match op {
                        Op::Put(k, v) => {
                            let key = format!("k.{}", k);
                            store.put(P1, key.clone(), versioned(v, version as u64));
                            model.insert(key, v);
                        }
                        Op::Delete(k) => {
                            let key = format!("k.{}", k);
                            let removed = store.delete(P1, &key).map(|vv| vv.value);
                            prop_assert_eq!(removed, model.remove(&key).map(Value::from));
                        }
                    }
                }

                prop_assert_eq!(store.partition_entry_count(P1), model.len());
                for (key, v) in &model {
                    prop_assert_eq!(store.get(P1, key).map(|vv| vv.value), Some(Value::from(*v)));
                }
            }
        }
    }
}
