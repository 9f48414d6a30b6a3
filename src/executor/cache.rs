// Copyright 2025 Kvexec Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Broadcast hash caches
//!
//! The right side of every hash-join clause is broadcast to the
//! partition ahead of the scan and registered under the clause's join
//! id. [`HashCache`] is the read capability the scanner probes;
//! [`HashCacheRegistry`] resolves join ids at scanner construction, so
//! a missing cache fails the scan before any row is pulled.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::Row;

/// Read capability over one broadcast right side
pub trait HashCache: Send + Sync {
    /// Rows grouped under an encoded probe key, if any
    fn get(&self, key: &[u8]) -> Option<&[Row]>;

    /// Number of distinct probe keys
    fn len(&self) -> usize;

    /// Whether the cache holds no rows
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry of broadcast caches available to one partition
pub trait HashCacheRegistry: Send + Sync {
    /// Look up the cache registered under a join id
    fn get(&self, join_id: &[u8]) -> Option<Arc<dyn HashCache>>;
}

/// In-memory hash cache keyed by encoded probe bytes
///
/// Rows are stored in shared form so each probe hit hands out O(1)
/// clones however many tuples it expands into.
#[derive(Debug, Default)]
pub struct MemoryHashCache {
    entries: AHashMap<Vec<u8>, Vec<Row>>,
}

impl MemoryHashCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row under a probe key
    pub fn insert(&mut self, key: Vec<u8>, row: Row) {
        self.entries.entry(key).or_default().push(row.into_shared());
    }
}

impl HashCache for MemoryHashCache {
    fn get(&self, key: &[u8]) -> Option<&[Row]> {
        self.entries.get(key).map(|rows| rows.as_slice())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// In-memory registry mapping join ids to caches
#[derive(Default)]
pub struct MemoryCacheRegistry {
    caches: RwLock<FxHashMap<Vec<u8>, Arc<dyn HashCache>>>,
}

impl MemoryCacheRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache under a join id, replacing any previous one
    pub fn register(&self, join_id: Vec<u8>, cache: Arc<dyn HashCache>) {
        self.caches.write().insert(join_id, cache);
    }

    /// Drop the cache registered under a join id
    pub fn remove(&self, join_id: &[u8]) -> Option<Arc<dyn HashCache>> {
        self.caches.write().remove(join_id)
    }
}

impl HashCacheRegistry for MemoryCacheRegistry {
    fn get(&self, join_id: &[u8]) -> Option<Arc<dyn HashCache>> {
        self.caches.read().get(join_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::Value;

    use super::*;

    #[test]
    fn test_cache_groups_rows_by_key() {
        let mut cache = MemoryHashCache::new();
        cache.insert(vec![1], Row::from_values(vec![Value::integer(10)]));
        cache.insert(vec![1], Row::from_values(vec![Value::integer(11)]));
        cache.insert(vec![2], Row::from_values(vec![Value::integer(20)]));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&[1]).unwrap().len(), 2);
        assert_eq!(cache.get(&[2]).unwrap().len(), 1);
        assert!(cache.get(&[3]).is_none());
    }

    #[test]
    fn test_registry_lookup_and_remove() {
        let registry = MemoryCacheRegistry::new();
        assert!(registry.get(&[0xab]).is_none());

        let mut cache = MemoryHashCache::new();
        cache.insert(vec![1], Row::from_values(vec![Value::integer(1)]));
        registry.register(vec![0xab], Arc::new(cache));

        let found = registry.get(&[0xab]).unwrap();
        assert_eq!(found.len(), 1);

        registry.remove(&[0xab]);
        assert!(registry.get(&[0xab]).is_none());
    }
}
