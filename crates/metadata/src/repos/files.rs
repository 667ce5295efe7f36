//! File record repository.
//!
//! The multi-entity operations here (logical copy, upload commit, soft
//! delete, tombstone purge) are single transactions: refcount, record, and
//! the owner's storage accounting move together or not at all.

use crate::error::MetadataResult;
use crate::models::{BlobRow, FileRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for user-scoped file records.
#[async_trait]
pub trait FileRepo: Send + Sync {
    /// Get a file record by id, tombstoned or not.
    async fn get_file(&self, file_id: Uuid) -> MetadataResult<Option<FileRow>>;

    /// Get a live (non-tombstoned) file record owned by the given user.
    async fn get_live_file(
        &self,
        file_id: Uuid,
        user_id: Uuid,
    ) -> MetadataResult<Option<FileRow>>;

    /// List live files for a user, newest first.
    async fn list_files(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> MetadataResult<Vec<FileRow>>;

    /// Count live files for a user.
    async fn count_files(&self, user_id: Uuid) -> MetadataResult<u64>;

    /// Count how many of the given ids are live records owned by the user.
    async fn count_live_files_owned(
        &self,
        file_ids: &[Uuid],
        user_id: Uuid,
    ) -> MetadataResult<u64>;

    /// Create a file record against an existing blob (logical copy).
    ///
    /// One transaction: verify the blob exists and is not banned, bump its
    /// refcount, insert the record, and charge the owner's storage with the
    /// quota admission check (`storage_used + size <= storage_quota`) folded
    /// into the update. Fails with `NotFound` (no blob), `Constraint`
    /// (banned blob), or `QuotaExceeded`; nothing is applied on failure.
    async fn create_file_for_blob(&self, file: &FileRow) -> MetadataResult<()>;

    /// Create a new blob row together with its first file record.
    ///
    /// One transaction: insert the blob (`ref_count = 1`), insert the
    /// record, charge the owner's storage with the quota admission check.
    /// Fails with `AlreadyExists` when another uploader committed the same
    /// hash first — the caller re-enters the logical-copy path.
    async fn create_blob_with_file(&self, blob: &BlobRow, file: &FileRow) -> MetadataResult<()>;

    /// Soft-delete a file record.
    ///
    /// One transaction: set the tombstone, release the blob refcount, and
    /// release the owner's storage. Returns the tombstoned row. Fails with
    /// `NotFound` if the record is missing, already tombstoned, or not
    /// owned by the user.
    async fn soft_delete_file(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> MetadataResult<FileRow>;

    /// Hard-remove tombstoned records older than the threshold.
    ///
    /// Refcounts were already released at soft-delete time, so this only
    /// deletes rows. Returns the number removed.
    async fn purge_tombstones(&self, older_than: OffsetDateTime) -> MetadataResult<u64>;
}
