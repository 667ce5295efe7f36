//! In-memory blob store.
//!
//! The reference implementation of the blob store contract, used in tests.
//! A mutex-guarded map with byte copies in and out so callers can never
//! alias the stored buffers.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobStat, BlobStore, blob_key};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory blob store.
#[derive(Default)]
pub struct MemoryBackend {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().expect("blob map poisoned").len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn put(&self, hash: &str, data: Bytes) -> StorageResult<()> {
        blob_key(hash)?;
        let mut objects = self.objects.lock().expect("blob map poisoned");
        if objects.contains_key(hash) {
            return Err(StorageError::AlreadyExists(hash.to_string()));
        }
        objects.insert(hash.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, hash: &str) -> StorageResult<Bytes> {
        blob_key(hash)?;
        let objects = self.objects.lock().expect("blob map poisoned");
        objects
            .get(hash)
            .map(|data| Bytes::copy_from_slice(data))
            .ok_or_else(|| StorageError::NotFound(hash.to_string()))
    }

    async fn delete(&self, hash: &str) -> StorageResult<()> {
        blob_key(hash)?;
        let mut objects = self.objects.lock().expect("blob map poisoned");
        objects
            .remove(hash)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(hash.to_string()))
    }

    async fn exists(&self, hash: &str) -> StorageResult<bool> {
        blob_key(hash)?;
        let objects = self.objects.lock().expect("blob map poisoned");
        Ok(objects.contains_key(hash))
    }

    async fn stat(&self, hash: &str) -> StorageResult<BlobStat> {
        let store_path = blob_key(hash)?;
        let objects = self.objects.lock().expect("blob map poisoned");
        let data = objects
            .get(hash)
            .ok_or_else(|| StorageError::NotFound(hash.to_string()))?;
        Ok(BlobStat {
            hash: hash.to_string(),
            size: data.len() as u64,
            store_path,
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stored_bytes_are_copied() {
        let backend = MemoryBackend::new();
        let hash = coffre_core::ContentHash::compute(b"aliasing test").to_hex();

        backend.put(&hash, Bytes::from("aliasing test")).await.unwrap();

        // Two reads return equal but independent buffers.
        let a = backend.get(&hash).await.unwrap();
        let b = backend.get(&hash).await.unwrap();
        assert_eq!(a, b);

        backend.delete(&hash).await.unwrap();
        assert_eq!(a, Bytes::from("aliasing test"));
        assert!(backend.is_empty());
    }
}
