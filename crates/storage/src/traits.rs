//! Blob store trait definitions.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;

/// Metadata about a stored blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobStat {
    /// The content hash the blob is keyed by.
    pub hash: String,
    /// Ciphertext size in bytes.
    pub size: u64,
    /// Backend-relative locator, stable across restarts.
    pub store_path: String,
}

/// Content-addressed blob store.
///
/// Keys are canonical content hashes (64 lowercase hex); every entry point
/// validates the key before touching the backend. Objects are laid out under
/// a two-level shard `hh[0:2]/hh[2:4]/hh` to bound directory fanout, and
/// `put` publishes atomically: a partially written object is never
/// observable under its hash.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store a blob. Fails with `AlreadyExists` if the hash is present.
    async fn put(&self, hash: &str, data: Bytes) -> StorageResult<()>;

    /// Fetch a blob's content, or `NotFound`.
    async fn get(&self, hash: &str) -> StorageResult<Bytes>;

    /// Remove a blob, or `NotFound` if absent.
    async fn delete(&self, hash: &str) -> StorageResult<()>;

    /// Check whether a blob exists.
    async fn exists(&self, hash: &str) -> StorageResult<bool>;

    /// Get a blob's metadata without fetching content.
    async fn stat(&self, hash: &str) -> StorageResult<BlobStat>;

    /// Get the name of this storage backend, for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify backend connectivity at startup.
    ///
    /// The default implementation returns Ok(()), suitable for backends
    /// that need no connectivity check.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Derive the sharded object key for a content hash.
///
/// `abcdef...` maps to `ab/cd/abcdef...`. Rejects non-canonical hashes so
/// no backend ever sees a key it did not expect.
pub fn blob_key(hash: &str) -> StorageResult<String> {
    coffre_core::hash::validate_hex(hash)
        .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
    Ok(format!("{}/{}/{}", &hash[0..2], &hash[2..4], hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_key_shards() {
        let hash = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(blob_key(hash).unwrap(), format!("e3/b0/{hash}"));
    }

    #[test]
    fn blob_key_rejects_bad_hashes() {
        assert!(blob_key("abc").is_err());
        assert!(blob_key(&"G".repeat(64)).is_err());
        assert!(blob_key(&"A".repeat(64)).is_err());
        assert!(blob_key("../../../../etc/passwd").is_err());
    }
}
