//! Crypto error types.

use thiserror::Error;

/// Crypto operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD tag verification failed: wrong key or tampered data.
    #[error("authentication failed: wrong key or corrupted data")]
    AuthFailed,

    #[error("invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for crypto operations.
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;
