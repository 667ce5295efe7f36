//! HTTP handlers.

pub mod auth;
pub mod dto;
pub mod files;
pub mod health;
pub mod public;
pub mod shares;

use crate::state::AppState;
use coffre_metadata::models::AuditRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Append an audit entry off the request path. Best effort: a failed
/// write is logged and never fails the request.
pub(crate) fn audit(state: &AppState, user_id: Option<Uuid>, action: &str, detail: Option<String>) {
    let metadata = state.metadata.clone();
    let entry = AuditRow {
        audit_id: Uuid::new_v4(),
        user_id,
        action: action.to_string(),
        detail,
        created_at: OffsetDateTime::now_utc(),
    };
    tokio::spawn(async move {
        if let Err(e) = metadata.append_audit(&entry).await {
            tracing::warn!(action = %entry.action, error = %e, "audit append failed");
        }
    });
}
