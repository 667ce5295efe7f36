//! Envelope encryption for blob storage.
//!
//! Every blob is encrypted with its own random data encryption key (DEK);
//! the DEK is wrapped by the process-resident key encryption key (KEK) and
//! persisted next to the blob metadata. The KEK never touches file bytes.
//!
//! Wire layouts:
//! ```text
//! wrapped DEK:   [12-byte nonce][32-byte ciphertext][16-byte tag]  (60 bytes, AES-256-GCM)
//! file (AEAD):   [12-byte nonce][N-byte ciphertext][16-byte tag]   (AES-256-GCM)
//! file (stream): [16-byte IV][N-byte ciphertext]                   (AES-256-CTR, no tag)
//! ```
//!
//! A deployment reads files back the way it wrote them; the two file modes
//! must not be mixed within one store.

pub mod envelope;
pub mod error;
pub mod keys;
pub mod stream;

pub use envelope::{decrypt_bytes, encrypt_bytes};
pub use error::{CryptoError, CryptoResult};
pub use keys::{Dek, Kek, unwrap_dek, unwrap_dek_base64, wrap_dek, wrap_dek_base64};
pub use stream::{decrypt_ctr, encrypt_ctr};

/// AES-256 key size (32 bytes).
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// AES-CTR IV size (16 bytes, one AES block).
pub const CTR_IV_SIZE: usize = 16;

/// Total size of a wrapped DEK: nonce + key ciphertext + tag.
pub const WRAPPED_DEK_SIZE: usize = NONCE_SIZE + KEY_SIZE + TAG_SIZE;
