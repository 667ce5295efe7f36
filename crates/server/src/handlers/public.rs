//! Anonymous share endpoints: retrieval by pickup code and download.

use crate::envelope::{Envelope, ok};
use crate::error::{ApiError, ApiResult};
use crate::handlers::dto::{FileDto, PublicShareDto};
use crate::range::file_response;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct AccessBody {
    pub password: Option<String>,
}

/// POST /api/public/shares/{code} - retrieve a share (password in body).
pub async fn get_share(
    State(state): State<AppState>,
    Path(code): Path<String>,
    body: Option<Json<AccessBody>>,
) -> ApiResult<Json<Envelope<PublicShareDto>>> {
    let password = body.as_ref().and_then(|b| b.password.clone());
    let (share, files) = state.shares.get_by_code(&code, password.as_deref()).await?;

    Ok(ok(PublicShareDto {
        has_password: share.has_password(),
        expires_at: share.expires_at,
        files: files.iter().map(FileDto::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub password: Option<String>,
    pub file_id: Option<Uuid>,
}

/// GET /api/public/download/{code} - anonymous download with range
/// support; `?password=` carries the share password.
///
/// The download counter is bumped after the response is produced, as a
/// fire-and-forget task: aborted transfers don't count, and concurrent
/// downloaders may overshoot the cap by the number in flight.
pub async fn download(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<DownloadQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let (share, files) = state
        .shares
        .get_by_code(&code, query.password.as_deref())
        .await?;

    let record = match query.file_id {
        Some(file_id) => files
            .iter()
            .find(|f| f.file_id == file_id)
            .ok_or_else(|| ApiError::NotFound(format!("file {file_id} not in share")))?,
        None => match files.as_slice() {
            [only] => only,
            [] => return Err(ApiError::NotFound("share has no surviving files".to_string())),
            _ => {
                return Err(ApiError::InvalidInput(
                    "share has multiple files; pass file_id".to_string(),
                ));
            }
        },
    };

    let plaintext = state.files.read_plaintext(record).await?;
    let response = file_response(&record.filename, plaintext, &headers);

    let shares = state.shares.clone();
    let share_id = share.share_id;
    tokio::spawn(async move {
        if let Err(e) = shares.increment_download(share_id).await {
            tracing::warn!(share_id = %share_id, error = %e, "download count increment failed");
        }
    });

    Ok(response)
}
