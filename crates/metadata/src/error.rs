//! Metadata store error types.

use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Storage admission failed: the write would push the owner past quota.
    #[error("storage quota exceeded for user {0}")]
    QuotaExceeded(uuid::Uuid),

    /// The caller's view of an upload offset is stale.
    #[error("upload offset conflict: expected {expected}, recorded {recorded}")]
    OffsetConflict { expected: i64, recorded: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
