//! Audit log repository.

use crate::error::MetadataResult;
use crate::models::AuditRow;
use async_trait::async_trait;

/// Repository for the append-only audit log.
#[async_trait]
pub trait AuditRepo: Send + Sync {
    /// Append an audit entry.
    async fn append_audit(&self, entry: &AuditRow) -> MetadataResult<()>;

    /// Most recent audit entries, newest first.
    async fn recent_audit(&self, limit: u32) -> MetadataResult<Vec<AuditRow>>;
}
