use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// Object store backed by a local directory.
///
/// Each bucket is a subdirectory of `root`; `/`-separated keys map onto
/// nested directories. Writes go to a temporary sibling file which is then
/// renamed into place, so readers never observe a partial object.
#[derive(Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map `bucket/key` onto a path below the root, rejecting traversal.
    fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        let mut path = self.root.clone();
        path.push(checked_segment(bucket, bucket)?);
        for segment in key.split('/') {
            path.push(checked_segment(key, segment)?);
        }
        Ok(path)
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".tmp-{}-{n}", std::process::id()));
        path.with_file_name(name)
    }

    async fn ensure_parent(path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn checked_segment<'a>(key: &str, segment: &'a str) -> StoreResult<&'a str> {
    let reason = if segment.is_empty() {
        "empty path segment"
    } else if segment == "." || segment == ".." {
        "relative path segment"
    } else if segment.contains('\\') || segment.contains('\0') {
        "forbidden character"
    } else {
        return Ok(segment);
    };
    Err(StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.into(),
    })
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<()> {
        let path = self.object_path(bucket, key)?;
        Self::ensure_parent(&path).await?;
        let tmp = self.temp_path(&path);
        tokio::fs::write(&tmp, &data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::debug!(bucket, key, size = data.len(), "wrote object");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(bucket, key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<bool> {
        let path = self.object_path(bucket, key)?;
        Self::ensure_parent(&path).await?;
        let tmp = self.temp_path(&path);
        if let Err(e) = tokio::fs::write(&tmp, &data).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        // A hard link never replaces an existing file, and the object only
        // becomes visible once it is complete.
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {
                tracing::debug!(bucket, key, size = data.len(), "created object");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
