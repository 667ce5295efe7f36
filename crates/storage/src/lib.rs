//! Content-addressed blob storage.
//!
//! A blob store maps a content hash to an opaque ciphertext object. The
//! trait is deliberately small — put, get, delete, exists, stat — and is
//! the single polymorphism point between local filesystem, S3, and the
//! in-memory test double.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{FilesystemBackend, MemoryBackend, S3Backend};
pub use error::{StorageError, StorageResult};
pub use traits::{BlobStat, BlobStore, blob_key};

use coffre_core::config::StorageConfig;
use std::sync::Arc;

/// Construct a blob store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn BlobStore>> {
    match config {
        StorageConfig::Local { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
            )
            .await?;
            Ok(Arc::new(backend))
        }
    }
}
