//! Content hash types and utilities.
//!
//! Every blob is keyed by the SHA-256 of its plaintext. The canonical wire
//! and database form is exactly 64 lowercase hex characters; anything else
//! is rejected at parse time.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 content hash represented as 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute SHA-256 hash of data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create an incremental hasher.
    pub fn hasher() -> ContentHasher {
        ContentHasher(Sha256::new())
    }

    /// Parse from the canonical hex form.
    ///
    /// Only 64 lowercase hex characters are accepted; uppercase digits are
    /// rejected so that a hash has exactly one persisted spelling.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        validate_hex(s)?;
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            bytes[i] = (hex_val(chunk[0]) << 4) | hex_val(chunk[1]);
        }
        Ok(Self(bytes))
    }

    /// Encode as the canonical lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Validate that a string is a canonical content hash: exactly 64 chars
/// from `[0-9a-f]`.
pub fn validate_hex(s: &str) -> crate::Result<()> {
    if s.len() != 64 {
        return Err(crate::Error::InvalidHash(format!(
            "expected 64 hex chars, got {}",
            s.len()
        )));
    }
    if let Some(c) = s
        .chars()
        .find(|c| !c.is_ascii_digit() && !('a'..='f').contains(c))
    {
        return Err(crate::Error::InvalidHash(format!(
            "non-canonical character {c:?} (lowercase hex required)"
        )));
    }
    Ok(())
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        _ => b - b'a' + 10,
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental SHA-256 hasher.
pub struct ContentHasher(Sha256);

impl ContentHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> ContentHash {
        ContentHash(self.0.finalize().into())
    }
}
