//! File content encryption with AES-256-GCM.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::Dek;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Encrypt file bytes with the given DEK.
///
/// Output: `[12-byte nonce][ciphertext][16-byte tag]`.
pub fn encrypt_bytes(plaintext: &[u8], dek: &Dek) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(dek.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::AuthFailed)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt file bytes. Fails with `AuthFailed` on tag mismatch.
pub fn decrypt_bytes(ciphertext: &[u8], dek: &Dek) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "ciphertext",
            expected: NONCE_SIZE + TAG_SIZE,
            actual: ciphertext.len(),
        });
    }

    let (nonce_bytes, body) = ciphertext.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(dek.as_bytes().into());

    cipher.decrypt(nonce, body).map_err(|_| CryptoError::AuthFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let dek = Dek::generate();
        let plaintext = b"hello, encrypted world!";

        let ciphertext = encrypt_bytes(plaintext, &dek).unwrap();
        assert_eq!(ciphertext.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);

        let decrypted = decrypt_bytes(&ciphertext, &dek).unwrap();
        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn roundtrip_empty() {
        let dek = Dek::generate();
        let ciphertext = encrypt_bytes(b"", &dek).unwrap();
        let decrypted = decrypt_bytes(&ciphertext, &dek).unwrap();
        assert_eq!(decrypted, b"");
    }

    #[test]
    fn roundtrip_large() {
        let dek = Dek::generate();
        let mut plaintext = vec![0u8; 10 * 1024 * 1024];
        for (i, b) in plaintext.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }

        let ciphertext = encrypt_bytes(&plaintext, &dek).unwrap();
        let decrypted = decrypt_bytes(&ciphertext, &dek).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_fails() {
        let ciphertext = encrypt_bytes(b"secret data", &Dek::generate()).unwrap();
        let result = decrypt_bytes(&ciphertext, &Dek::generate());
        assert!(matches!(result, Err(CryptoError::AuthFailed)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let dek = Dek::generate();
        let mut ciphertext = encrypt_bytes(b"secret data", &dek).unwrap();
        ciphertext[NONCE_SIZE + 1] ^= 0xff;

        let result = decrypt_bytes(&ciphertext, &dek);
        assert!(matches!(result, Err(CryptoError::AuthFailed)));
    }

    #[test]
    fn truncated_fails() {
        let dek = Dek::generate();
        let result = decrypt_bytes(&[0u8; 10], &dek);
        assert!(matches!(result, Err(CryptoError::InvalidLength { .. })));
    }
}
