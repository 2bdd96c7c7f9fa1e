use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// Default deadline for `get` and `exists`.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for `put`, `create` and `delete`.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Decorator that bounds every call on the wrapped store by a deadline.
///
/// An expired deadline surfaces as [`StoreError::Timeout`]; the inner
/// future is dropped.
pub struct TimeoutObjectStore {
    inner: Arc<dyn ObjectStore>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl TimeoutObjectStore {
    pub fn new(inner: Arc<dyn ObjectStore>, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
            write_timeout,
        }
    }

    /// Wrap with [`DEFAULT_READ_TIMEOUT`] and [`DEFAULT_WRITE_TIMEOUT`].
    pub fn with_defaults(inner: Arc<dyn ObjectStore>) -> Self {
        Self::new(inner, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT)
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    async fn bounded<T>(
        operation: &'static str,
        limit: Duration,
        bucket: &str,
        key: &str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, bucket, key, ?limit, "store call timed out");
                Err(StoreError::Timeout {
                    operation,
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    elapsed: limit,
                })
            }
        }
    }
}

#[async_trait]
impl ObjectStore for TimeoutObjectStore {
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<()> {
        let fut = self.inner.put(bucket, key, data);
        Self::bounded("put", self.write_timeout, bucket, key, fut).await
    }

    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let fut = self.inner.get(bucket, key);
        Self::bounded("get", self.read_timeout, bucket, key, fut).await
    }

    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let fut = self.inner.exists(bucket, key);
        Self::bounded("exists", self.read_timeout, bucket, key, fut).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let fut = self.inner.delete(bucket, key);
        Self::bounded("delete", self.write_timeout, bucket, key, fut).await
    }

    async fn create(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<bool> {
        let fut = self.inner.create(bucket, key, data);
        Self::bounded("create", self.write_timeout, bucket, key, fut).await
    }
}

impl std::fmt::Debug for TimeoutObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutObjectStore")
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}
