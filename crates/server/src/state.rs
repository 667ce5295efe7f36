//! Application state shared across handlers.

use crate::services::{FileService, ShareService, UserService};
use crate::tus::UploadLocks;
use coffre_core::config::AppConfig;
use coffre_crypto::Kek;
use coffre_metadata::MetadataStore;
use coffre_storage::BlobStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Blob storage backend.
    pub blobs: Arc<dyn BlobStore>,
    /// Accounts and tokens.
    pub users: Arc<UserService>,
    /// File operations.
    pub files: Arc<FileService>,
    /// Share operations.
    pub shares: Arc<ShareService>,
    /// Per-upload-id locks for the resumable front-end.
    pub upload_locks: UploadLocks,
}

impl AppState {
    /// Create a new application state wiring the services together.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails; callers validate at
    /// startup before building state.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        kek: Kek,
    ) -> Self {
        if let Err(error) = config.validate() {
            panic!("invalid configuration: {error}");
        }

        let kek = Arc::new(kek);
        let users = Arc::new(UserService::new(
            metadata.clone(),
            &config.crypto.jwt_secret,
            config.business.clone(),
        ));
        let files = Arc::new(FileService::new(
            metadata.clone(),
            blobs.clone(),
            kek,
            config.business.max_file_size,
        ));
        let shares = Arc::new(ShareService::new(
            metadata.clone(),
            files.clone(),
            config.business.clone(),
        ));

        Self {
            config: Arc::new(config),
            metadata,
            blobs,
            users,
            files,
            shares,
            upload_locks: UploadLocks::default(),
        }
    }
}
