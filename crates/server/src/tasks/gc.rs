//! Garbage collection: tombstone purge, orphan blob reclamation, and the
//! upload fragment sweep.

use coffre_core::config::GcConfig;
use coffre_metadata::MetadataStore;
use coffre_storage::{BlobStore, StorageError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;

/// Orphan blobs processed per run; leftovers wait for the next sweep.
const ORPHAN_BATCH: u32 = 1000;

/// Stale upload sessions processed per run.
const FRAGMENT_BATCH: u32 = 1000;

/// Result of one GC run.
#[derive(Debug, Default, Serialize)]
pub struct GcOutcome {
    pub tombstones_purged: u64,
    pub orphan_blobs_deleted: u64,
    pub bytes_reclaimed: u64,
    pub fragments_swept: u64,
    pub errors: u64,
}

/// The garbage collector.
pub struct GarbageCollector {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    upload_dir: PathBuf,
    config: GcConfig,
}

impl GarbageCollector {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        upload_dir: PathBuf,
        config: GcConfig,
    ) -> Self {
        Self {
            metadata,
            blobs,
            upload_dir,
            config,
        }
    }

    /// Run one full GC pass.
    pub async fn run(&self, now: OffsetDateTime) -> GcOutcome {
        let mut outcome = GcOutcome::default();
        tracing::info!("garbage collection starting");

        self.purge_tombstones(now, &mut outcome).await;
        self.reclaim_orphan_blobs(&mut outcome).await;
        self.sweep_fragments(now, &mut outcome).await;

        tracing::info!(
            tombstones = outcome.tombstones_purged,
            orphans = outcome.orphan_blobs_deleted,
            bytes = outcome.bytes_reclaimed,
            fragments = outcome.fragments_swept,
            errors = outcome.errors,
            "garbage collection finished"
        );
        outcome
    }

    /// Hard-remove tombstoned records past retention.
    ///
    /// Refcounts were released at soft-delete time; the purge only drops
    /// rows.
    async fn purge_tombstones(&self, now: OffsetDateTime, outcome: &mut GcOutcome) {
        let threshold = now - self.config.retention();
        match self.metadata.purge_tombstones(threshold).await {
            Ok(purged) => outcome.tombstones_purged = purged,
            Err(e) => {
                outcome.errors += 1;
                tracing::error!(error = %e, "tombstone purge failed");
            }
        }
    }

    /// Free blobs nothing references: best-effort ciphertext delete, then
    /// the guarded row delete. The row is the authoritative existence
    /// flag, so a failed ciphertext delete is logged but does not keep the
    /// row alive — a dangling object is picked up by a later sweep.
    async fn reclaim_orphan_blobs(&self, outcome: &mut GcOutcome) {
        let orphans = match self.metadata.get_orphan_blobs(ORPHAN_BATCH).await {
            Ok(orphans) => orphans,
            Err(e) => {
                outcome.errors += 1;
                tracing::error!(error = %e, "orphan blob scan failed");
                return;
            }
        };

        for blob in orphans {
            match self.blobs.delete(&blob.hash).await {
                Ok(()) | Err(StorageError::NotFound(_)) => {}
                Err(e) => {
                    outcome.errors += 1;
                    tracing::warn!(hash = %blob.hash, error = %e, "ciphertext delete failed");
                }
            }

            match self.metadata.delete_orphan_blob(&blob.hash).await {
                Ok(true) => {
                    outcome.orphan_blobs_deleted += 1;
                    outcome.bytes_reclaimed += blob.size.max(0) as u64;
                }
                // The refcount rose between the scan and the delete; the
                // blob lives on.
                Ok(false) => {
                    tracing::debug!(hash = %blob.hash, "orphan gained a reference, skipped");
                }
                Err(e) => {
                    outcome.errors += 1;
                    tracing::error!(hash = %blob.hash, error = %e, "orphan blob row delete failed");
                }
            }
        }
    }

    /// Reclaim abandoned upload fragments past the retention window:
    /// the temp object and the session row.
    async fn sweep_fragments(&self, now: OffsetDateTime, outcome: &mut GcOutcome) {
        let threshold = now - self.config.fragment_retention();
        let stale = match self
            .metadata
            .get_stale_upload_sessions(threshold, FRAGMENT_BATCH)
            .await
        {
            Ok(stale) => stale,
            Err(e) => {
                outcome.errors += 1;
                tracing::error!(error = %e, "stale upload scan failed");
                return;
            }
        };

        for session in stale {
            let path = self.upload_dir.join(session.upload_id.to_string());
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    outcome.errors += 1;
                    tracing::warn!(upload_id = %session.upload_id, error = %e, "fragment delete failed");
                    continue;
                }
            }
            match self.metadata.delete_upload_session(session.upload_id).await {
                Ok(()) => outcome.fragments_swept += 1,
                Err(e) => {
                    outcome.errors += 1;
                    tracing::error!(upload_id = %session.upload_id, error = %e, "upload session delete failed");
                }
            }
        }
    }
}
