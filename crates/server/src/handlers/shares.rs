//! Share endpoints for authenticated owners and recipients.

use crate::auth::CurrentUser;
use crate::envelope::{Envelope, ok, ok_empty};
use crate::error::ApiResult;
use crate::handlers::audit;
use crate::handlers::dto::ShareDto;
use crate::handlers::files::Pagination;
use crate::services::CreateShareRequest;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateShareBody {
    pub file_ids: Vec<Uuid>,
    /// Lifetime in seconds; server default applies when absent.
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub max_downloads: i64,
    pub password: Option<String>,
}

/// POST /api/shares
pub async fn create_share(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateShareBody>,
) -> ApiResult<Json<Envelope<ShareDto>>> {
    let share = state
        .shares
        .create_share(
            user.id(),
            CreateShareRequest {
                file_ids: body.file_ids,
                expires_in_secs: body.expires_in,
                max_downloads: body.max_downloads,
                password: body.password,
            },
        )
        .await?;

    audit(
        &state,
        Some(user.id()),
        "share.create",
        Some(share.share_id.to_string()),
    );
    Ok(ok(ShareDto::from(&share)))
}

#[derive(Debug, Serialize)]
pub struct ShareListResponse {
    pub shares: Vec<ShareDto>,
    pub total: u64,
}

/// GET /api/shares
pub async fn list_shares(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Envelope<ShareListResponse>>> {
    let (shares, total) = state
        .shares
        .list(
            user.id(),
            page.page.unwrap_or(1),
            page.page_size.unwrap_or(0),
        )
        .await?;

    Ok(ok(ShareListResponse {
        shares: shares.iter().map(ShareDto::from).collect(),
        total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SaveToVaultBody {
    pub file_ids: Vec<Uuid>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveToVaultResponse {
    pub saved_ids: Vec<Uuid>,
    pub errors: Vec<String>,
}

/// POST /api/shares/{code}/save - save shared files into the caller's
/// vault as logical copies.
pub async fn save_to_vault(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(code): Path<String>,
    Json(body): Json<SaveToVaultBody>,
) -> ApiResult<Json<Envelope<SaveToVaultResponse>>> {
    let outcome = state
        .shares
        .save_to_vault(&code, body.password.as_deref(), &body.file_ids, user.id())
        .await?;

    audit(
        &state,
        Some(user.id()),
        "share.save_to_vault",
        Some(format!("saved {} files", outcome.saved_ids.len())),
    );
    Ok(ok(SaveToVaultResponse {
        saved_ids: outcome.saved_ids,
        errors: outcome.errors,
    }))
}

/// DELETE /api/shares/{id} - stop a share.
pub async fn stop_share(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(share_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<()>>> {
    state.shares.stop(share_id, user.id()).await?;

    audit(
        &state,
        Some(user.id()),
        "share.stop",
        Some(share_id.to_string()),
    );
    Ok(ok_empty())
}
