//! Local filesystem blob store.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobStat, BlobStore, blob_key};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem blob store.
///
/// Blobs live at `root/hh[0:2]/hh[2:4]/hh`. Publish is write-to-temp,
/// fsync, rename so a crashed write never leaves a readable partial object
/// under the hash.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend rooted at the given directory.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, hash: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(blob_key(hash)?))
    }

    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Remove now-empty shard directories after a delete. Best effort;
    /// a concurrent put may repopulate them at any time.
    async fn prune_shards(&self, path: &Path) {
        let mut dir = path.parent();
        while let Some(parent) = dir {
            if parent == self.root {
                break;
            }
            if fs::remove_dir(parent).await.is_err() {
                break;
            }
            dir = parent.parent();
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBackend {
    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, hash: &str, data: Bytes) -> StorageResult<()> {
        let path = self.blob_path(hash)?;
        if fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists(hash.to_string()));
        }
        self.ensure_parent(&path).await?;

        // Unique temp name so concurrent writers of the same hash never
        // clobber each other's partial file.
        let temp_path = path.with_file_name(format!(
            "{}.tmp.{}",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Uuid::new_v4()
        ));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, hash: &str) -> StorageResult<Bytes> {
        let path = self.blob_path(hash)?;
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(hash.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, hash: &str) -> StorageResult<()> {
        let path = self.blob_path(hash)?;
        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(hash.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        self.prune_shards(&path).await;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, hash: &str) -> StorageResult<bool> {
        let path = self.blob_path(hash)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn stat(&self, hash: &str) -> StorageResult<BlobStat> {
        let path = self.blob_path(hash)?;
        let metadata = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(hash.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        Ok(BlobStat {
            hash: hash.to_string(),
            size: metadata.len(),
            store_path: blob_key(hash)?,
        })
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {:?}",
                self.root
            )));
        }

        Ok(())
    }
}
