//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Error body of the response envelope: `{code, message, error}` with
/// `code` mirroring the HTTP status.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    pub error: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid pickup code")]
    InvalidCode,

    #[error("share has expired")]
    Expired,

    #[error("share has been stopped")]
    Stopped,

    #[error("share download limit reached")]
    Exhausted,

    #[error("password required")]
    PasswordRequired,

    #[error("invalid password")]
    InvalidPassword,

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("size mismatch: declared {declared}, got {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("upload offset conflict: expected {expected}, recorded {recorded}")]
    OffsetConflict { expected: i64, recorded: i64 },

    #[error("content has been banned")]
    BannedContent,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(coffre_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(coffre_metadata::MetadataError),

    #[error("crypto error: {0}")]
    Crypto(coffre_crypto::CryptoError),

    #[error("{0}")]
    Core(#[from] coffre_core::Error),
}

impl From<coffre_metadata::MetadataError> for ApiError {
    fn from(err: coffre_metadata::MetadataError) -> Self {
        use coffre_metadata::MetadataError;
        // Domain outcomes that transactions surface as typed errors map to
        // their API kinds; the rest stays a metadata error.
        match err {
            MetadataError::QuotaExceeded(_) => Self::QuotaExceeded,
            MetadataError::OffsetConflict { expected, recorded } => {
                Self::OffsetConflict { expected, recorded }
            }
            MetadataError::NotFound(msg) => Self::NotFound(msg),
            other => Self::Metadata(other),
        }
    }
}

impl From<coffre_storage::StorageError> for ApiError {
    fn from(err: coffre_storage::StorageError) -> Self {
        match err {
            coffre_storage::StorageError::NotFound(key) => {
                Self::NotFound(format!("object {key} not found"))
            }
            coffre_storage::StorageError::InvalidKey(msg) => Self::InvalidInput(msg),
            other => Self::Storage(other),
        }
    }
}

impl From<coffre_crypto::CryptoError> for ApiError {
    fn from(err: coffre_crypto::CryptoError) -> Self {
        // Crypto auth failures are never recovered locally; they surface
        // as internal errors and fail the operation.
        Self::Crypto(err)
    }
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCode => StatusCode::BAD_REQUEST,
            Self::Expired => StatusCode::BAD_REQUEST,
            Self::Stopped => StatusCode::BAD_REQUEST,
            Self::Exhausted => StatusCode::BAD_REQUEST,
            Self::PasswordRequired => StatusCode::UNAUTHORIZED,
            Self::InvalidPassword => StatusCode::FORBIDDEN,
            Self::QuotaExceeded => StatusCode::INSUFFICIENT_STORAGE,
            Self::SizeMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::OffsetConflict { .. } => StatusCode::CONFLICT,
            Self::BannedContent => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) => match e {
                coffre_metadata::MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                coffre_metadata::MetadataError::Constraint(_) => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(e) => match e {
                coffre_core::Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Stable error kind for programmatic handling.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::InvalidCode => "invalid_code",
            Self::Expired => "expired",
            Self::Stopped => "stopped",
            Self::Exhausted => "exhausted",
            Self::PasswordRequired => "password_required",
            Self::InvalidPassword => "invalid_password",
            Self::QuotaExceeded => "quota_exceeded",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::OffsetConflict { .. } => "offset_conflict",
            Self::BannedContent => "banned_content",
            Self::Internal(_) => "internal_error",
            Self::Storage(_) => "storage_error",
            Self::Metadata(_) => "metadata_error",
            Self::Crypto(_) => "crypto_error",
            Self::Core(_) => "invalid_input",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: status.as_u16(),
            message: self.to_string(),
            error: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
