//! Blob repository.

use crate::error::MetadataResult;
use crate::models::BlobRow;
use async_trait::async_trait;

/// Repository for deduplicated blob records.
#[async_trait]
pub trait BlobRepo: Send + Sync {
    /// Get a blob by content hash.
    async fn get_blob(&self, hash: &str) -> MetadataResult<Option<BlobRow>>;

    /// Check if a blob exists.
    async fn blob_exists(&self, hash: &str) -> MetadataResult<bool>;

    /// Ban or unban a blob. Banned blobs refuse new references and
    /// downloads but keep their refcount until reclaim.
    async fn set_blob_banned(
        &self,
        hash: &str,
        banned: bool,
        reason: Option<&str>,
    ) -> MetadataResult<()>;

    /// Get blobs with `ref_count <= 0`, oldest first.
    async fn get_orphan_blobs(&self, limit: u32) -> MetadataResult<Vec<BlobRow>>;

    /// Delete a blob row, guarded: only removes it while `ref_count <= 0`.
    ///
    /// Returns true when the row was deleted. The guard re-checks the
    /// refcount inside the delete so a concurrent logical copy between the
    /// orphan scan and this call keeps the blob alive.
    async fn delete_orphan_blob(&self, hash: &str) -> MetadataResult<bool>;
}
