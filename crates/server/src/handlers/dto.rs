//! Response payload types.

use coffre_metadata::models::{FileRow, ShareRow, UserRow};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// A user, without credential material.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub status: String,
    pub storage_quota: i64,
    pub storage_used: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&UserRow> for UserDto {
    fn from(user: &UserRow) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            role: user.role.clone(),
            status: user.status.clone(),
            storage_quota: user.storage_quota,
            storage_used: user.storage_used,
            created_at: user.created_at,
        }
    }
}

/// A user-scoped file record.
#[derive(Debug, Serialize)]
pub struct FileDto {
    pub file_id: Uuid,
    pub filename: String,
    pub size: i64,
    pub hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl From<&FileRow> for FileDto {
    fn from(file: &FileRow) -> Self {
        Self {
            file_id: file.file_id,
            filename: file.filename.clone(),
            size: file.size,
            hash: file.blob_hash.clone(),
            created_at: file.created_at,
            expires_at: file.expires_at,
        }
    }
}

/// A share session as seen by its creator.
#[derive(Debug, Serialize)]
pub struct ShareDto {
    pub share_id: Uuid,
    pub pickup_code: String,
    pub status: String,
    pub has_password: bool,
    pub max_downloads: i64,
    pub current_downloads: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub stopped_at: Option<OffsetDateTime>,
}

impl From<&ShareRow> for ShareDto {
    fn from(share: &ShareRow) -> Self {
        use coffre_metadata::models::ShareStatus;
        let status = match share.status(OffsetDateTime::now_utc()) {
            ShareStatus::Active => "active",
            ShareStatus::Stopped => "stopped",
            ShareStatus::Expired => "expired",
            ShareStatus::Exhausted => "exhausted",
        };
        Self {
            share_id: share.share_id,
            pickup_code: share.pickup_code.clone(),
            status: status.to_string(),
            has_password: share.has_password(),
            max_downloads: share.max_downloads,
            current_downloads: share.current_downloads,
            created_at: share.created_at,
            expires_at: share.expires_at,
            stopped_at: share.stopped_at,
        }
    }
}

/// A share session as seen by an anonymous recipient: no pickup-code echo
/// beyond what they typed, no creator identity.
#[derive(Debug, Serialize)]
pub struct PublicShareDto {
    pub has_password: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub files: Vec<FileDto>,
}
