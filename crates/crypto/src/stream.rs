//! Streaming file encryption with AES-256-CTR.
//!
//! CTR mode carries no integrity tag. A deployment using this mode relies
//! on the content-addressed hash of the plaintext plus the authenticated
//! DEK wrap for integrity; a deployment must not mix this mode with the
//! AEAD mode in `envelope` for the same store.

use aes::Aes256;
use aes::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use rand::rngs::OsRng;
use std::io::{Read, Write};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::Dek;
use crate::CTR_IV_SIZE;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Encrypt a byte stream with AES-256-CTR.
///
/// Writes a random 16-byte IV followed by the keystream-XORed bytes.
/// Returns the number of plaintext bytes processed.
pub fn encrypt_ctr<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    dek: &Dek,
) -> CryptoResult<u64> {
    let mut iv = [0u8; CTR_IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    writer.write_all(&iv)?;

    let mut cipher = Aes256Ctr::new(dek.as_bytes().into(), &iv.into());
    copy_through(reader, writer, &mut cipher)
}

/// Decrypt a byte stream written by `encrypt_ctr`.
///
/// Reads the 16-byte IV prefix, then streams the remaining bytes through
/// the keystream. Returns the number of plaintext bytes produced.
pub fn decrypt_ctr<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    dek: &Dek,
) -> CryptoResult<u64> {
    let mut iv = [0u8; CTR_IV_SIZE];
    reader
        .read_exact(&mut iv)
        .map_err(|_| CryptoError::InvalidLength {
            what: "CTR stream IV",
            expected: CTR_IV_SIZE,
            actual: 0,
        })?;

    let mut cipher = Aes256Ctr::new(dek.as_bytes().into(), &iv.into());
    copy_through(reader, writer, &mut cipher)
}

fn copy_through<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    cipher: &mut Aes256Ctr,
) -> CryptoResult<u64> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        cipher.apply_keystream(&mut buf[..n]);
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let dek = Dek::generate();
        let plaintext = b"streaming encrypted content".repeat(1000);

        let mut encrypted = Vec::new();
        let written = encrypt_ctr(&mut Cursor::new(&plaintext), &mut encrypted, &dek).unwrap();
        assert_eq!(written, plaintext.len() as u64);
        assert_eq!(encrypted.len(), CTR_IV_SIZE + plaintext.len());

        let mut decrypted = Vec::new();
        decrypt_ctr(&mut Cursor::new(&encrypted), &mut decrypted, &dek).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn roundtrip_empty() {
        let dek = Dek::generate();

        let mut encrypted = Vec::new();
        encrypt_ctr(&mut Cursor::new(&b""[..]), &mut encrypted, &dek).unwrap();
        assert_eq!(encrypted.len(), CTR_IV_SIZE);

        let mut decrypted = Vec::new();
        decrypt_ctr(&mut Cursor::new(&encrypted), &mut decrypted, &dek).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn wrong_key_garbles() {
        let plaintext = b"not authenticated, just confidential";
        let mut encrypted = Vec::new();
        encrypt_ctr(&mut Cursor::new(&plaintext[..]), &mut encrypted, &Dek::generate()).unwrap();

        let mut decrypted = Vec::new();
        decrypt_ctr(&mut Cursor::new(&encrypted), &mut decrypted, &Dek::generate()).unwrap();
        assert_ne!(decrypted, plaintext);
    }

    #[test]
    fn missing_iv_fails() {
        let dek = Dek::generate();
        let mut out = Vec::new();
        let result = decrypt_ctr(&mut Cursor::new(&[0u8; 4][..]), &mut out, &dek);
        assert!(matches!(result, Err(CryptoError::InvalidLength { .. })));
    }
}
