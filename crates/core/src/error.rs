//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid pickup code: {0}")]
    InvalidPickupCode(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("weak password: {0}")]
    WeakPassword(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
