//! Key types and DEK wrapping.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, NONCE_SIZE, WRAPPED_DEK_SIZE};

/// The process-resident key encryption key. Zeroized on drop.
pub struct Kek {
    bytes: [u8; KEY_SIZE],
}

impl Kek {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for Kek {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Kek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kek").field("bytes", &"[REDACTED]").finish()
    }
}

/// A per-blob data encryption key. Zeroized on drop.
pub struct Dek {
    bytes: [u8; KEY_SIZE],
}

impl Dek {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Generate a fresh random DEK.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }
}

impl Drop for Dek {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dek").field("bytes", &"[REDACTED]").finish()
    }
}

/// Wrap a DEK under the KEK with AES-256-GCM.
///
/// Output: `[12-byte nonce][32-byte ciphertext][16-byte tag]` = 60 bytes.
/// The nonce is fresh random per call, so wrapping the same DEK twice
/// yields distinct ciphertexts.
pub fn wrap_dek(dek: &Dek, kek: &Kek) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(kek.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, dek.as_bytes().as_ref())
        .map_err(|_| CryptoError::AuthFailed)?;

    let mut out = Vec::with_capacity(WRAPPED_DEK_SIZE);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Wrap a DEK and encode the result as base64 for database storage.
pub fn wrap_dek_base64(dek: &Dek, kek: &Kek) -> CryptoResult<String> {
    Ok(BASE64.encode(wrap_dek(dek, kek)?))
}

/// Unwrap a DEK. Fails with `AuthFailed` on tag mismatch.
pub fn unwrap_dek(wrapped: &[u8], kek: &Kek) -> CryptoResult<Dek> {
    if wrapped.len() != WRAPPED_DEK_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "wrapped DEK",
            expected: WRAPPED_DEK_SIZE,
            actual: wrapped.len(),
        });
    }

    let (nonce_bytes, ciphertext) = wrapped.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(kek.as_bytes().into());

    let mut plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::AuthFailed)?;

    if plaintext.len() != KEY_SIZE {
        plaintext.zeroize();
        return Err(CryptoError::InvalidLength {
            what: "unwrapped DEK",
            expected: KEY_SIZE,
            actual: plaintext.len(),
        });
    }

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();
    Ok(Dek::from_bytes(bytes))
}

/// Unwrap a base64-encoded DEK from database storage.
pub fn unwrap_dek_base64(wrapped: &str, kek: &Kek) -> CryptoResult<Dek> {
    let bytes = BASE64.decode(wrapped)?;
    unwrap_dek(&bytes, kek)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_kek() -> Kek {
        Kek::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn dek_generation_is_random() {
        let a = Dek::generate();
        let b = Dek::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn wrap_unwrap_roundtrip() {
        let kek = test_kek();
        let dek = Dek::generate();

        let wrapped = wrap_dek(&dek, &kek).unwrap();
        assert_eq!(wrapped.len(), WRAPPED_DEK_SIZE);

        let unwrapped = unwrap_dek(&wrapped, &kek).unwrap();
        assert_eq!(dek.as_bytes(), unwrapped.as_bytes());
    }

    #[test]
    fn wrapping_twice_differs() {
        let kek = test_kek();
        let dek = Dek::generate();

        let a = wrap_dek(&dek, &kek).unwrap();
        let b = wrap_dek(&dek, &kek).unwrap();
        assert_ne!(a, b, "fresh nonce per wrap");
    }

    #[test]
    fn unwrap_wrong_kek_fails() {
        let dek = Dek::generate();
        let wrapped = wrap_dek(&dek, &Kek::from_bytes([1u8; KEY_SIZE])).unwrap();

        let result = unwrap_dek(&wrapped, &Kek::from_bytes([2u8; KEY_SIZE]));
        assert!(matches!(result, Err(CryptoError::AuthFailed)));
    }

    #[test]
    fn unwrap_truncated_fails() {
        let kek = test_kek();
        let dek = Dek::generate();
        let wrapped = wrap_dek(&dek, &kek).unwrap();

        let result = unwrap_dek(&wrapped[..WRAPPED_DEK_SIZE - 1], &kek);
        assert!(matches!(result, Err(CryptoError::InvalidLength { .. })));
    }

    #[test]
    fn base64_roundtrip() {
        let kek = test_kek();
        let dek = Dek::generate();

        let encoded = wrap_dek_base64(&dek, &kek).unwrap();
        let unwrapped = unwrap_dek_base64(&encoded, &kek).unwrap();
        assert_eq!(dek.as_bytes(), unwrapped.as_bytes());
    }
}
