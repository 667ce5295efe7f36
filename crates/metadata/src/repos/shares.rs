//! Share repository.

use crate::error::MetadataResult;
use crate::models::{FileRow, ShareRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for share sessions.
#[async_trait]
pub trait ShareRepo: Send + Sync {
    /// Check whether a pickup code is already taken.
    async fn pickup_code_exists(&self, code: &str) -> MetadataResult<bool>;

    /// Create a share session and its file joins in one transaction.
    ///
    /// Fails with `AlreadyExists` if the pickup code collides on the
    /// unique index (the caller retries with a fresh code).
    async fn create_share_with_files(
        &self,
        share: &ShareRow,
        file_ids: &[Uuid],
    ) -> MetadataResult<()>;

    /// Get a share by id.
    async fn get_share(&self, share_id: Uuid) -> MetadataResult<Option<ShareRow>>;

    /// Get a share by pickup code.
    async fn get_share_by_code(&self, code: &str) -> MetadataResult<Option<ShareRow>>;

    /// Get the surviving files of a share: joined records that are live
    /// and whose backing blob is not banned.
    async fn get_share_files(&self, share_id: Uuid) -> MetadataResult<Vec<FileRow>>;

    /// Atomically bump the download counter.
    async fn increment_downloads(&self, share_id: Uuid) -> MetadataResult<()>;

    /// Stop a share. Only the creator's rows match; returns true when a
    /// running share was stopped.
    async fn stop_share(
        &self,
        share_id: Uuid,
        creator_id: Uuid,
        now: OffsetDateTime,
    ) -> MetadataResult<bool>;

    /// List a creator's shares, newest first.
    async fn list_shares(
        &self,
        creator_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> MetadataResult<Vec<ShareRow>>;

    /// Count a creator's shares.
    async fn count_shares(&self, creator_id: Uuid) -> MetadataResult<u64>;

    /// Mark running shares past their expiry as stopped. Returns the
    /// number swept.
    async fn stop_expired_shares(&self, now: OffsetDateTime) -> MetadataResult<u64>;

    /// Mark running shares at or past their download cap as stopped.
    /// Returns the number swept.
    async fn stop_exhausted_shares(&self, now: OffsetDateTime) -> MetadataResult<u64>;
}
