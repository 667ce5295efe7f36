//! The share service: pickup-code minting, lifecycle gates, password
//! gating, save-to-vault, and download accounting.

use crate::error::{ApiError, ApiResult};
use crate::services::files::FileService;
use crate::services::users::{hash_password, verify_password};
use coffre_core::config::BusinessConfig;
use coffre_core::{clamp_page, pickup};
use coffre_metadata::models::{FileRow, ShareRow, ShareStatus};
use coffre_metadata::{MetadataError, MetadataStore};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Collision retry bound for pickup-code minting. The unique index on
/// `pickup_code` is the arbiter; at 32^8 codes ten attempts never lose in
/// practice.
const MAX_CODE_ATTEMPTS: u32 = 10;

/// Parameters for creating a share.
pub struct CreateShareRequest {
    pub file_ids: Vec<Uuid>,
    /// Lifetime in seconds; the configured default applies when absent.
    pub expires_in_secs: Option<u64>,
    /// 0 = unlimited.
    pub max_downloads: i64,
    pub password: Option<String>,
}

/// The result of a save-to-vault: per-file partial success.
pub struct SaveOutcome {
    pub saved_ids: Vec<Uuid>,
    pub errors: Vec<String>,
}

/// Share operations.
pub struct ShareService {
    metadata: Arc<dyn MetadataStore>,
    files: Arc<FileService>,
    business: BusinessConfig,
}

impl ShareService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        files: Arc<FileService>,
        business: BusinessConfig,
    ) -> Self {
        Self {
            metadata,
            files,
            business,
        }
    }

    /// Create a share over a set of the caller's live files.
    pub async fn create_share(
        &self,
        user_id: Uuid,
        req: CreateShareRequest,
    ) -> ApiResult<ShareRow> {
        if req.file_ids.is_empty() {
            return Err(ApiError::InvalidInput("no files selected".to_string()));
        }
        if req.file_ids.len() > self.business.max_files_per_share {
            return Err(ApiError::InvalidInput(format!(
                "at most {} files per share",
                self.business.max_files_per_share
            )));
        }
        if req.max_downloads < 0 {
            return Err(ApiError::InvalidInput(
                "max_downloads must not be negative".to_string(),
            ));
        }

        let expires_in = match req.expires_in_secs {
            Some(secs) => {
                let requested = Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX));
                if requested > self.business.max_share_expiry() {
                    return Err(ApiError::InvalidInput(format!(
                        "share lifetime exceeds maximum of {} seconds",
                        self.business.max_share_expiry_secs
                    )));
                }
                requested
            }
            None => self.business.default_share_expiry(),
        };

        // Every id must be a live record owned by the caller.
        let owned = self
            .metadata
            .count_live_files_owned(&req.file_ids, user_id)
            .await?;
        if owned != req.file_ids.len() as u64 {
            return Err(ApiError::NotFound(
                "some files not found or access denied".to_string(),
            ));
        }

        // Shares over banned content are refused at creation, not just at
        // retrieval.
        for file_id in &req.file_ids {
            let record = self
                .metadata
                .get_live_file(*file_id, user_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("file {file_id} not found")))?;
            let blob = self.metadata.get_blob(&record.blob_hash).await?;
            if blob.is_some_and(|b| b.is_banned) {
                return Err(ApiError::BannedContent);
            }
        }

        let password_hash = match req.password.as_deref() {
            Some(password) if !password.is_empty() => Some(hash_password(password)?),
            _ => None,
        };

        let now = OffsetDateTime::now_utc();
        let code_length = self.business.share_code_length;

        // Mint until the unique index accepts the code.
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = pickup::generate(code_length);
            if self.metadata.pickup_code_exists(&code).await? {
                continue;
            }

            let share = ShareRow {
                share_id: Uuid::new_v4(),
                pickup_code: code,
                creator_id: user_id,
                password_hash: password_hash.clone(),
                max_downloads: req.max_downloads,
                current_downloads: 0,
                created_at: now,
                expires_at: now + expires_in,
                stopped_at: None,
            };

            match self
                .metadata
                .create_share_with_files(&share, &req.file_ids)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        share_id = %share.share_id,
                        files = req.file_ids.len(),
                        "share created"
                    );
                    return Ok(share);
                }
                // Collision under the unique index; mint a fresh code.
                Err(MetadataError::AlreadyExists(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ApiError::Internal(format!(
            "failed to mint a unique pickup code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    /// Retrieve a share by pickup code, applying every gate.
    ///
    /// Gate order: stopped, expired, exhausted, then password. The file
    /// list is the surviving subset: records the creator has since deleted
    /// (or whose blob was banned) drop out.
    pub async fn get_by_code(
        &self,
        code: &str,
        password: Option<&str>,
    ) -> ApiResult<(ShareRow, Vec<FileRow>)> {
        pickup::validate(code, self.business.share_code_length)
            .map_err(|_| ApiError::InvalidCode)?;

        let share = self
            .metadata
            .get_share_by_code(code)
            .await?
            .ok_or(ApiError::InvalidCode)?;

        match share.status(OffsetDateTime::now_utc()) {
            ShareStatus::Stopped => return Err(ApiError::Stopped),
            ShareStatus::Expired => return Err(ApiError::Expired),
            ShareStatus::Exhausted => return Err(ApiError::Exhausted),
            ShareStatus::Active => {}
        }

        if share.has_password() {
            let supplied = password.unwrap_or_default();
            if supplied.is_empty() {
                return Err(ApiError::PasswordRequired);
            }
            let stored = share.password_hash.as_deref().unwrap_or_default();
            if !verify_password(supplied, stored)? {
                return Err(ApiError::InvalidPassword);
            }
        }

        let files = self.metadata.get_share_files(share.share_id).await?;
        Ok((share, files))
    }

    /// Bump the download counter. Called once per completed download;
    /// handlers fire this after the response, so overshoot under
    /// concurrency is bounded by the number of in-flight downloads.
    pub async fn increment_download(&self, share_id: Uuid) -> ApiResult<()> {
        self.metadata.increment_downloads(share_id).await?;
        Ok(())
    }

    /// Save shared files into the recipient's own vault as logical copies.
    ///
    /// Per-file failures don't abort the rest; the outcome carries the
    /// saved ids and the errors. Counts as one download.
    pub async fn save_to_vault(
        &self,
        code: &str,
        password: Option<&str>,
        file_ids: &[Uuid],
        recipient: Uuid,
    ) -> ApiResult<SaveOutcome> {
        let (share, files) = self.get_by_code(code, password).await?;

        let mut saved_ids = Vec::new();
        let mut errors = Vec::new();
        for file_id in file_ids {
            let Some(file) = files.iter().find(|f| f.file_id == *file_id) else {
                // Not part of the surviving set; skip silently like absent
                // ids in the share itself.
                continue;
            };
            match self
                .files
                .logical_copy(recipient, &file.blob_hash, &file.filename)
                .await
            {
                Ok(record) => saved_ids.push(record.file_id),
                Err(e) => {
                    tracing::warn!(
                        file_id = %file.file_id,
                        error = %e,
                        "save-to-vault failed for file"
                    );
                    errors.push(format!("{}: {e}", file.filename));
                }
            }
        }

        self.increment_download(share.share_id).await?;
        Ok(SaveOutcome { saved_ids, errors })
    }

    /// Stop a share. Idempotent for the creator; `NotFound` for anyone
    /// else.
    pub async fn stop(&self, share_id: Uuid, user_id: Uuid) -> ApiResult<()> {
        let now = OffsetDateTime::now_utc();
        if self.metadata.stop_share(share_id, user_id, now).await? {
            tracing::info!(share_id = %share_id, "share stopped");
            return Ok(());
        }

        // No row transitioned: either already stopped (fine, for the
        // creator) or not the caller's share.
        match self.metadata.get_share(share_id).await? {
            Some(share) if share.creator_id == user_id => Ok(()),
            _ => Err(ApiError::NotFound(format!("share {share_id} not found"))),
        }
    }

    /// List the caller's shares, newest first.
    pub async fn list(
        &self,
        user_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> ApiResult<(Vec<ShareRow>, u64)> {
        let (page, page_size) = clamp_page(page, page_size);
        let offset = (page - 1) * page_size;
        let shares = self.metadata.list_shares(user_id, page_size, offset).await?;
        let total = self.metadata.count_shares(user_id).await?;
        Ok((shares, total))
    }
}
