//! Share lifecycle sweep: expire and exhaust running sessions.

use coffre_metadata::MetadataStore;
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;

/// Result of one lifecycle sweep.
#[derive(Debug, Default, Serialize)]
pub struct LifecycleOutcome {
    pub expired_stopped: u64,
    pub exhausted_stopped: u64,
    pub errors: u64,
}

/// Periodic share lifecycle checker.
pub struct LifecycleSweep {
    metadata: Arc<dyn MetadataStore>,
}

impl LifecycleSweep {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Stop shares past expiry and shares at their download cap.
    pub async fn run(&self, now: OffsetDateTime) -> LifecycleOutcome {
        let mut outcome = LifecycleOutcome::default();

        match self.metadata.stop_expired_shares(now).await {
            Ok(count) => outcome.expired_stopped = count,
            Err(e) => {
                outcome.errors += 1;
                tracing::error!(error = %e, "expired share sweep failed");
            }
        }

        match self.metadata.stop_exhausted_shares(now).await {
            Ok(count) => outcome.exhausted_stopped = count,
            Err(e) => {
                outcome.errors += 1;
                tracing::error!(error = %e, "exhausted share sweep failed");
            }
        }

        if outcome.expired_stopped > 0 || outcome.exhausted_stopped > 0 {
            tracing::info!(
                expired = outcome.expired_stopped,
                exhausted = outcome.exhausted_stopped,
                "lifecycle sweep stopped shares"
            );
        }
        outcome
    }
}
