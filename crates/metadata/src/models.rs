//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Users
// =============================================================================

/// User role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// User account status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

/// User account record.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub storage_quota: i64,
    pub storage_used: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl UserRow {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin.as_str()
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active.as_str()
    }
}

// =============================================================================
// Blobs (the dedup objects)
// =============================================================================

/// Deduplicated blob record, keyed by the plaintext content hash.
///
/// `ref_count` counts the file records holding a strong reference; a blob
/// at zero is an orphan and eligible for reclamation.
#[derive(Debug, Clone, FromRow)]
pub struct BlobRow {
    pub hash: String,
    pub store_path: String,
    /// DEK wrapped by the process KEK, base64.
    pub encrypted_dek: String,
    /// Plaintext length in bytes.
    pub size: i64,
    pub ref_count: i64,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub created_at: OffsetDateTime,
}

// =============================================================================
// File records (user-scoped logical files)
// =============================================================================

/// User-scoped logical file pointing at a shared blob.
///
/// `deleted_at IS NULL` is the canonical "live" predicate; a tombstoned row
/// lingers until retention expiry, then the reclaimer hard-removes it.
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub file_id: Uuid,
    pub user_id: Uuid,
    pub blob_hash: String,
    pub filename: String,
    pub size: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
    pub deleted_at: Option<OffsetDateTime>,
}

impl FileRow {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

// =============================================================================
// Shares
// =============================================================================

/// Share session gated by pickup code, expiry, download cap, and password.
#[derive(Debug, Clone, FromRow)]
pub struct ShareRow {
    pub share_id: Uuid,
    pub pickup_code: String,
    pub creator_id: Uuid,
    pub password_hash: Option<String>,
    /// 0 = unlimited.
    pub max_downloads: i64,
    pub current_downloads: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub stopped_at: Option<OffsetDateTime>,
}

/// Derived share status. Once non-active, a share never returns to active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareStatus {
    Active,
    Stopped,
    Expired,
    Exhausted,
}

impl ShareRow {
    /// Derive the share status, gates ordered stopped > expired > exhausted.
    pub fn status(&self, now: OffsetDateTime) -> ShareStatus {
        if self.stopped_at.is_some() {
            ShareStatus::Stopped
        } else if now >= self.expires_at {
            ShareStatus::Expired
        } else if self.max_downloads > 0 && self.current_downloads >= self.max_downloads {
            ShareStatus::Exhausted
        } else {
            ShareStatus::Active
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// Join row: the files a share exposes.
#[derive(Debug, Clone, FromRow)]
pub struct ShareFileRow {
    pub share_id: Uuid,
    pub file_id: Uuid,
}

// =============================================================================
// Upload sessions (resumable front-end)
// =============================================================================

/// Resumable upload state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    Uploading,
    Completed,
    Failed,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Resumable upload session record.
#[derive(Debug, Clone, FromRow)]
pub struct UploadSessionRow {
    pub upload_id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub declared_size: i64,
    /// Pre-declared content hash enabling the instant-upload probe.
    pub declared_hash: Option<String>,
    pub upload_offset: i64,
    pub state: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// Audit log and settings
// =============================================================================

/// Append-only audit entry.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub audit_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub detail: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Key/value system setting.
#[derive(Debug, Clone, FromRow)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn share(now: OffsetDateTime) -> ShareRow {
        ShareRow {
            share_id: Uuid::new_v4(),
            pickup_code: "ABCD2345".to_string(),
            creator_id: Uuid::new_v4(),
            password_hash: None,
            max_downloads: 0,
            current_downloads: 0,
            created_at: now,
            expires_at: now + Duration::hours(1),
            stopped_at: None,
        }
    }

    #[test]
    fn share_status_gate_order() {
        let now = OffsetDateTime::now_utc();

        let mut s = share(now);
        assert_eq!(s.status(now), ShareStatus::Active);

        s.max_downloads = 2;
        s.current_downloads = 2;
        assert_eq!(s.status(now), ShareStatus::Exhausted);

        s.expires_at = now - Duration::seconds(1);
        assert_eq!(s.status(now), ShareStatus::Expired);

        s.stopped_at = Some(now);
        assert_eq!(s.status(now), ShareStatus::Stopped);
    }

    #[test]
    fn unlimited_shares_never_exhaust() {
        let now = OffsetDateTime::now_utc();
        let mut s = share(now);
        s.max_downloads = 0;
        s.current_downloads = 10_000;
        assert_eq!(s.status(now), ShareStatus::Active);
    }
}
