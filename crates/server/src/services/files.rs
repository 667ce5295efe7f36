//! The file service: instant upload, the streaming upload pipeline,
//! authenticated download, soft delete, and listing.

use crate::error::{ApiError, ApiResult};
use bytes::Bytes;
use coffre_core::{ContentHash, clamp_page, hash::validate_hex};
use coffre_crypto::{Dek, Kek, decrypt_bytes, encrypt_bytes, unwrap_dek_base64, wrap_dek_base64};
use coffre_metadata::models::{BlobRow, FileRow};
use coffre_metadata::{MetadataError, MetadataStore};
use coffre_storage::{BlobStore, StorageError, blob_key};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// How long to wait for the winning uploader's blob row after losing the
/// ciphertext publish race. The winner publishes the object before its
/// metadata commits, so the row can trail the object by a moment.
const PUBLISH_RACE_RETRIES: u32 = 5;
const PUBLISH_RACE_BACKOFF: Duration = Duration::from_millis(100);

/// A decrypted download: the record plus its plaintext.
pub struct DownloadedFile {
    pub record: FileRow,
    pub plaintext: Bytes,
}

/// File operations over the blob store and metadata.
pub struct FileService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    kek: Arc<Kek>,
    max_file_size: u64,
}

impl FileService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        kek: Arc<Kek>,
        max_file_size: u64,
    ) -> Self {
        Self {
            metadata,
            blobs,
            kek,
            max_file_size,
        }
    }

    /// Instant-upload probe: does a blob for this hash already exist?
    ///
    /// Does not mutate state. A banned blob is an error, not a miss — the
    /// client must not fall back to uploading banned content.
    pub async fn check_instant(&self, hash: &str) -> ApiResult<Option<BlobRow>> {
        validate_hex(hash)?;
        match self.metadata.get_blob(hash).await? {
            None => Ok(None),
            Some(blob) if blob.is_banned => Err(ApiError::BannedContent),
            Some(blob) => Ok(Some(blob)),
        }
    }

    /// Create a file record against an existing blob (instant upload /
    /// save-to-vault). Refcount, record, and storage accounting commit in
    /// one transaction; the record's size is the blob's size.
    pub async fn logical_copy(
        &self,
        user_id: Uuid,
        hash: &str,
        filename: &str,
    ) -> ApiResult<FileRow> {
        validate_hex(hash)?;
        self.insert_reference(user_id, hash, filename).await
    }

    /// Upload new content.
    ///
    /// Hashes the bytes once; a dedup hit becomes a logical copy without a
    /// second ciphertext. Otherwise the plaintext is encrypted under a
    /// fresh DEK, the DEK wrapped under the KEK, the ciphertext published,
    /// and the blob row, file record, and storage charge committed in one
    /// transaction. The DEK is zeroized on every exit path (on drop).
    pub async fn upload(
        &self,
        user_id: Uuid,
        filename: &str,
        declared_size: u64,
        data: Bytes,
    ) -> ApiResult<FileRow> {
        if declared_size > self.max_file_size {
            return Err(ApiError::InvalidInput(format!(
                "file exceeds maximum size of {} bytes",
                self.max_file_size
            )));
        }
        if data.len() as u64 != declared_size {
            return Err(ApiError::SizeMismatch {
                declared: declared_size,
                actual: data.len() as u64,
            });
        }

        let mut hasher = ContentHash::hasher();
        hasher.update(&data);
        let hash = hasher.finalize().to_hex();

        // Dedup fast path.
        if let Some(blob) = self.metadata.get_blob(&hash).await? {
            if blob.is_banned {
                return Err(ApiError::BannedContent);
            }
            return self.insert_reference(user_id, &hash, filename).await;
        }

        let dek = Dek::generate();
        let ciphertext = encrypt_bytes(&data, &dek)?;
        let encrypted_dek = wrap_dek_base64(&dek, &self.kek)?;
        drop(dek);

        match self.blobs.put(&hash, Bytes::from(ciphertext)).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(_)) => {
                // Lost the publish race for identical content; reference
                // the winner's blob instead.
                return self.reference_after_race(user_id, &hash, filename).await;
            }
            Err(e) => return Err(e.into()),
        }

        let now = OffsetDateTime::now_utc();
        let blob = BlobRow {
            hash: hash.clone(),
            store_path: blob_key(&hash)?,
            encrypted_dek,
            size: declared_size as i64,
            ref_count: 1,
            is_banned: false,
            ban_reason: None,
            created_at: now,
        };
        let record = FileRow {
            file_id: Uuid::new_v4(),
            user_id,
            blob_hash: hash.clone(),
            filename: filename.to_string(),
            size: declared_size as i64,
            created_at: now,
            expires_at: None,
            deleted_at: None,
        };

        match self.metadata.create_blob_with_file(&blob, &record).await {
            Ok(()) => {
                tracing::debug!(hash = %hash, size = declared_size, "blob published");
                Ok(record)
            }
            Err(MetadataError::AlreadyExists(_)) => {
                // A row appeared while our ciphertext went in; the object
                // now backs that row, so just take a reference.
                self.insert_reference(user_id, &hash, filename).await
            }
            Err(e) => {
                // Remove the orphan ciphertext. The cleanup error is logged
                // and suppressed in favor of the primary error.
                if let Err(cleanup) = self.blobs.delete(&hash).await {
                    tracing::warn!(
                        hash = %hash,
                        error = %cleanup,
                        "failed to remove ciphertext after aborted commit"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Authenticated download: ownership, tombstone, and expiry gates, then
    /// DEK unwrap and decrypt.
    pub async fn download(&self, file_id: Uuid, user_id: Uuid) -> ApiResult<DownloadedFile> {
        let record = self
            .metadata
            .get_live_file(file_id, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("file {file_id} not found")))?;

        let now = OffsetDateTime::now_utc();
        if record.is_expired(now) {
            return Err(ApiError::NotFound("file has expired".to_string()));
        }

        let plaintext = self.read_plaintext(&record).await?;
        Ok(DownloadedFile { record, plaintext })
    }

    /// Decrypt the blob backing a record. Callers have already passed
    /// their own access gate (ownership or a share).
    pub async fn read_plaintext(&self, record: &FileRow) -> ApiResult<Bytes> {
        let blob = self
            .metadata
            .get_blob(&record.blob_hash)
            .await?
            .ok_or_else(|| {
                // A live record holds a strong reference; a missing blob row
                // is an invariant breach, not a user error.
                ApiError::Internal(format!("blob {} missing for live record", record.blob_hash))
            })?;
        if blob.is_banned {
            return Err(ApiError::BannedContent);
        }

        let dek = unwrap_dek_base64(&blob.encrypted_dek, &self.kek)?;
        let ciphertext = self.blobs.get(&blob.hash).await?;
        let plaintext = decrypt_bytes(&ciphertext, &dek)?;
        Ok(Bytes::from(plaintext))
    }

    /// Soft delete: tombstone the record, releasing its refcount and the
    /// owner's storage immediately. The ciphertext stays until the
    /// reclaimer finds the blob orphaned.
    pub async fn delete(&self, file_id: Uuid, user_id: Uuid) -> ApiResult<FileRow> {
        let now = OffsetDateTime::now_utc();
        let record = self
            .metadata
            .soft_delete_file(file_id, user_id, now)
            .await?;
        tracing::info!(file_id = %file_id, user_id = %user_id, "file soft-deleted");
        Ok(record)
    }

    /// List live files, newest first.
    pub async fn list(
        &self,
        user_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> ApiResult<(Vec<FileRow>, u64)> {
        let (page, page_size) = clamp_page(page, page_size);
        let offset = (page - 1) * page_size;
        let files = self.metadata.list_files(user_id, page_size, offset).await?;
        let total = self.metadata.count_files(user_id).await?;
        Ok((files, total))
    }

    async fn insert_reference(
        &self,
        user_id: Uuid,
        hash: &str,
        filename: &str,
    ) -> ApiResult<FileRow> {
        let blob = self
            .metadata
            .get_blob(hash)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("blob {hash} not found")))?;
        if blob.is_banned {
            return Err(ApiError::BannedContent);
        }

        let record = FileRow {
            file_id: Uuid::new_v4(),
            user_id,
            blob_hash: hash.to_string(),
            filename: filename.to_string(),
            size: blob.size,
            created_at: OffsetDateTime::now_utc(),
            expires_at: None,
            deleted_at: None,
        };

        match self.metadata.create_file_for_blob(&record).await {
            Ok(()) => Ok(record),
            // The transaction re-checks the ban under its own lock.
            Err(MetadataError::Constraint(_)) => Err(ApiError::BannedContent),
            Err(e) => Err(e.into()),
        }
    }

    async fn reference_after_race(
        &self,
        user_id: Uuid,
        hash: &str,
        filename: &str,
    ) -> ApiResult<FileRow> {
        for attempt in 0..PUBLISH_RACE_RETRIES {
            match self.insert_reference(user_id, hash, filename).await {
                Err(ApiError::NotFound(_)) if attempt + 1 < PUBLISH_RACE_RETRIES => {
                    tokio::time::sleep(PUBLISH_RACE_BACKOFF).await;
                }
                other => return other,
            }
        }
        Err(ApiError::Internal(format!(
            "blob row for {hash} did not appear after publish race"
        )))
    }
}
