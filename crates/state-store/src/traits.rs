use async_trait::async_trait;

use crate::error::StoreResult;

/// Bucket/key addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - `get` of an absent key returns [`StoreError::NotFound`](crate::StoreError::NotFound),
///   never an empty payload.
/// - `put` overwrites unconditionally.
/// - The store never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` at `bucket/key`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<()>;

    /// Read the object at `bucket/key`.
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>>;

    /// Check whether an object exists at `bucket/key`.
    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool>;

    /// Delete the object at `bucket/key`. Returns `true` if it existed.
    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<bool>;

    /// Write `data` only if nothing exists at `bucket/key`.
    ///
    /// Returns `false` without writing when the key is taken. The default
    /// implementation probes then writes, which is not atomic; backends that
    /// can do better should override it.
    async fn create(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<bool> {
        if self.exists(bucket, key).await? {
            return Ok(false);
        }
        self.put(bucket, key, data).await?;
        Ok(true)
    }
}
