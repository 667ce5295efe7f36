//! File endpoints: listing, instant-upload probe, logical copy,
//! multipart upload, download, soft delete.

use crate::auth::CurrentUser;
use crate::envelope::{Envelope, ok, ok_empty};
use crate::error::{ApiError, ApiResult};
use crate::handlers::audit;
use crate::handlers::dto::FileDto;
use crate::range::file_response;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileDto>,
    pub total: u64,
}

/// GET /api/files
pub async fn list_files(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Envelope<FileListResponse>>> {
    let (files, total) = state
        .files
        .list(
            user.id(),
            page.page.unwrap_or(1),
            page.page_size.unwrap_or(0),
        )
        .await?;

    Ok(ok(FileListResponse {
        files: files.iter().map(FileDto::from).collect(),
        total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub hash: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

/// POST /api/files/check - instant-upload probe.
pub async fn check_instant(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(req): Json<CheckRequest>,
) -> ApiResult<Json<Envelope<CheckResponse>>> {
    let blob = state.files.check_instant(&req.hash).await?;
    Ok(ok(CheckResponse {
        exists: blob.is_some(),
        size: blob.map(|b| b.size),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
    pub hash: String,
    pub filename: String,
}

/// POST /api/files - create a record from a known hash (instant upload).
pub async fn create_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateFileRequest>,
) -> ApiResult<Json<Envelope<FileDto>>> {
    if req.filename.is_empty() {
        return Err(ApiError::InvalidInput("filename must not be empty".to_string()));
    }

    let record = state
        .files
        .logical_copy(user.id(), &req.hash, &req.filename)
        .await?;

    audit(
        &state,
        Some(user.id()),
        "file.instant_upload",
        Some(record.file_id.to_string()),
    );
    Ok(ok(FileDto::from(&record)))
}

/// POST /api/files/upload - single-request multipart upload.
pub async fn upload_file(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Envelope<FileDto>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("uploaded_file")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidInput(format!("failed to read upload: {e}")))?;

        let size = data.len() as u64;
        let record = state.files.upload(user.id(), &filename, size, data).await?;

        audit(
            &state,
            Some(user.id()),
            "file.upload",
            Some(record.file_id.to_string()),
        );
        return Ok(ok(FileDto::from(&record)));
    }

    Err(ApiError::InvalidInput(
        "multipart body must contain a 'file' field".to_string(),
    ))
}

/// GET /api/files/{id}/download - authenticated download with range
/// support.
pub async fn download_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(file_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let downloaded = state.files.download(file_id, user.id()).await?;

    audit(
        &state,
        Some(user.id()),
        "file.download",
        Some(file_id.to_string()),
    );
    Ok(file_response(
        &downloaded.record.filename,
        downloaded.plaintext,
        &headers,
    ))
}

/// DELETE /api/files/{id} - soft delete.
pub async fn delete_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(file_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<()>>> {
    state.files.delete(file_id, user.id()).await?;

    audit(
        &state,
        Some(user.id()),
        "file.delete",
        Some(file_id.to_string()),
    );
    Ok(ok_empty())
}
