use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

type ObjectKey = (String, String);

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. The lock is only taken inside
/// synchronous sections, never across an await. `create` is atomic here.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectKey, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored, across all buckets.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Remove all objects from the store.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }

    /// Sorted keys of every object in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<String> = map
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Synchronous read, for inspection in tests.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    /// Synchronous write, for seeding in tests.
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert((bucket.to_string(), key.to_string()), data.into());
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<()> {
        self.insert(bucket, key, data);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        self.object(bucket, key)
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(&(bucket.to_string(), key.to_string())).is_some())
    }

    async fn create(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        let slot = (bucket.to_string(), key.to_string());
        if map.contains_key(&slot) {
            return Ok(false);
        }
        map.insert(slot, data);
        Ok(true)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}
