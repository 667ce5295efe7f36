//! Upload session repository.

use crate::error::MetadataResult;
use crate::models::UploadSessionRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for resumable upload sessions.
#[async_trait]
pub trait UploadRepo: Send + Sync {
    /// Create an upload session.
    async fn create_upload_session(&self, session: &UploadSessionRow) -> MetadataResult<()>;

    /// Get an upload session.
    async fn get_upload_session(
        &self,
        upload_id: Uuid,
    ) -> MetadataResult<Option<UploadSessionRow>>;

    /// Advance the recorded offset by `delta`, guarded on the expected
    /// current offset.
    ///
    /// The guard (`WHERE upload_offset = expected`) makes concurrent
    /// appenders serialize at the database: the loser gets
    /// `OffsetConflict`. Returns the new offset.
    async fn advance_upload_offset(
        &self,
        upload_id: Uuid,
        expected_offset: i64,
        delta: i64,
        now: OffsetDateTime,
    ) -> MetadataResult<i64>;

    /// Update the session state.
    async fn set_upload_state(
        &self,
        upload_id: Uuid,
        state: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Delete an upload session.
    async fn delete_upload_session(&self, upload_id: Uuid) -> MetadataResult<()>;

    /// Get unfinished sessions idle since before the threshold, for the
    /// fragment sweep.
    async fn get_stale_upload_sessions(
        &self,
        older_than: OffsetDateTime,
        limit: u32,
    ) -> MetadataResult<Vec<UploadSessionRow>>;
}
