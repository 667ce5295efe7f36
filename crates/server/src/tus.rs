//! Resumable upload front-end.
//!
//! A tus-style chunked protocol: CREATE declares the length (and
//! optionally the content hash, enabling the instant-upload probe),
//! APPEND carries `Upload-Offset`-checked chunks into a temp object,
//! HEAD resumes, DELETE discards, OPTIONS advertises capabilities. On
//! reaching the declared length the assembled temp file is handed to the
//! file service on a background worker; a failed finalize leaves the
//! fragment for the reclaimer's sweep.

use crate::auth::CurrentUser;
use crate::envelope::ok;
use crate::error::{ApiError, ApiResult};
use crate::handlers::dto::FileDto;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use coffre_metadata::models::{UploadSessionRow, UploadState};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Protocol version advertised and required.
const TUS_VERSION: &str = "1.0.0";

/// Fallback when the client declares no filename.
const DEFAULT_FILENAME: &str = "uploaded_file";

/// Per-upload-id locks.
///
/// A single upload id is appended to or finalized by exactly one task at
/// a time; the DB offset guard alone cannot prevent interleaved file
/// appends.
#[derive(Clone, Default)]
pub struct UploadLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl UploadLocks {
    /// Acquire the lock for an upload id, creating it on first use.
    pub async fn acquire(&self, upload_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(upload_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry once the upload id is gone.
    pub async fn release(&self, upload_id: Uuid) {
        self.inner.lock().await.remove(&upload_id);
    }
}

/// Parse the `Upload-Metadata` header: comma-separated `key base64value`
/// pairs (a bare key carries an empty value). Undecodable entries are
/// skipped.
fn parse_metadata(header: &str) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    for pair in header.split(',') {
        let mut parts = pair.trim().splitn(2, ' ');
        let Some(key) = parts.next().filter(|k| !k.is_empty()) else {
            continue;
        };
        let value = match parts.next() {
            None => String::new(),
            Some(encoded) => match BASE64.decode(encoded) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(s) => s,
                    Err(_) => continue,
                },
                Err(_) => continue,
            },
        };
        meta.insert(key.to_string(), value);
    }
    meta
}

fn temp_path(state: &AppState, upload_id: Uuid) -> PathBuf {
    state.config.server.upload_dir.join(upload_id.to_string())
}

fn header_u64(headers: &HeaderMap, name: &str) -> ApiResult<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| ApiError::InvalidInput(format!("missing or invalid {name} header")))
}

/// OPTIONS /api/tus/upload - advertise protocol capabilities.
pub async fn options_upload(State(state): State<AppState>) -> Response {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Tus-Resumable", TUS_VERSION)
        .header("Tus-Version", TUS_VERSION)
        .header("Tus-Extension", "creation,termination")
        .header("Tus-Max-Size", state.config.business.max_file_size)
        .body(Body::empty())
        .expect("static response")
}

/// POST /api/tus/upload - create an upload session.
///
/// With a pre-declared hash that already has a blob, the upload completes
/// immediately as a logical copy and no upload URL is issued. The
/// authenticated user id is bound to the session here so the finalize
/// worker, which runs outside this request, attributes the file
/// correctly.
pub async fn create_upload(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let length = header_u64(&headers, "Upload-Length")?;
    if length > state.config.business.max_file_size {
        return Err(ApiError::InvalidInput(format!(
            "upload exceeds maximum size of {} bytes",
            state.config.business.max_file_size
        )));
    }

    let metadata = headers
        .get("Upload-Metadata")
        .and_then(|v| v.to_str().ok())
        .map(parse_metadata)
        .unwrap_or_default();
    let filename = metadata
        .get("filename")
        .filter(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let declared_hash = metadata.get("hash").filter(|h| !h.is_empty()).cloned();

    // Instant-upload probe on a pre-declared hash.
    if let Some(hash) = &declared_hash {
        if state.files.check_instant(hash).await?.is_some() {
            let record = state.files.logical_copy(user.id(), hash, &filename).await?;
            tracing::info!(file_id = %record.file_id, "resumable upload hit instant path");
            let body = ok(serde_json::json!({
                "completed": true,
                "file": FileDto::from(&record),
            }));
            return Ok((
                StatusCode::CREATED,
                [("Tus-Resumable", TUS_VERSION)],
                body,
            )
                .into_response());
        }
    }

    let now = OffsetDateTime::now_utc();
    let session = UploadSessionRow {
        upload_id: Uuid::new_v4(),
        user_id: user.id(),
        filename,
        declared_size: length as i64,
        declared_hash,
        upload_offset: 0,
        state: UploadState::Uploading.as_str().to_string(),
        created_at: now,
        updated_at: now,
    };
    state.metadata.create_upload_session(&session).await?;

    tokio::fs::File::create(temp_path(&state, session.upload_id))
        .await
        .map_err(|e| ApiError::Internal(format!("cannot create upload temp file: {e}")))?;

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("Tus-Resumable", TUS_VERSION)
        .header(
            header::LOCATION,
            format!("/api/tus/upload/{}", session.upload_id),
        )
        .header("Upload-Offset", 0)
        .header("Upload-Length", length)
        .body(Body::empty())
        .expect("static response"))
}

/// PATCH /api/tus/upload/{id} - append a chunk at the declared offset.
pub async fn append_chunk(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(upload_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != "application/offset+octet-stream" {
        return Err(ApiError::InvalidInput(
            "content type must be application/offset+octet-stream".to_string(),
        ));
    }
    let client_offset = header_u64(&headers, "Upload-Offset")? as i64;

    let _guard = state.upload_locks.acquire(upload_id).await;

    let session = state
        .metadata
        .get_upload_session(upload_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload {upload_id} not found")))?;
    if session.user_id != user.id() {
        return Err(ApiError::Forbidden("not your upload".to_string()));
    }
    if session.state != UploadState::Uploading.as_str() {
        return Err(ApiError::InvalidInput(format!(
            "upload is {}, not accepting chunks",
            session.state
        )));
    }
    if client_offset != session.upload_offset {
        return Err(ApiError::OffsetConflict {
            expected: client_offset,
            recorded: session.upload_offset,
        });
    }
    if session.upload_offset + body.len() as i64 > session.declared_size {
        return Err(ApiError::InvalidInput(
            "chunk overruns the declared upload length".to_string(),
        ));
    }

    let path = temp_path(&state, upload_id);
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot open upload temp file: {e}")))?;
    file.write_all(&body)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot append chunk: {e}")))?;
    file.sync_data()
        .await
        .map_err(|e| ApiError::Internal(format!("cannot flush chunk: {e}")))?;

    let now = OffsetDateTime::now_utc();
    let new_offset = state
        .metadata
        .advance_upload_offset(upload_id, client_offset, body.len() as i64, now)
        .await?;

    if new_offset == session.declared_size {
        spawn_finalize(state.clone(), session, path);
    }

    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Tus-Resumable", TUS_VERSION)
        .header("Upload-Offset", new_offset)
        .body(Body::empty())
        .expect("static response"))
}

/// HEAD /api/tus/upload/{id} - report current offset and length.
pub async fn head_upload(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(upload_id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = state
        .metadata
        .get_upload_session(upload_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload {upload_id} not found")))?;
    if session.user_id != user.id() {
        return Err(ApiError::Forbidden("not your upload".to_string()));
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Tus-Resumable", TUS_VERSION)
        .header("Upload-Offset", session.upload_offset)
        .header("Upload-Length", session.declared_size)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::empty())
        .expect("static response"))
}

/// DELETE /api/tus/upload/{id} - discard the temp object and session.
pub async fn delete_upload(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(upload_id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = state
        .metadata
        .get_upload_session(upload_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload {upload_id} not found")))?;
    if session.user_id != user.id() {
        return Err(ApiError::Forbidden("not your upload".to_string()));
    }

    let _guard = state.upload_locks.acquire(upload_id).await;
    let _ = tokio::fs::remove_file(temp_path(&state, upload_id)).await;
    state.metadata.delete_upload_session(upload_id).await?;
    drop(_guard);
    state.upload_locks.release(upload_id).await;

    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Tus-Resumable", TUS_VERSION)
        .body(Body::empty())
        .expect("static response"))
}

/// Hand the assembled temp file to the file service on a worker task.
///
/// Success removes the temp object and the session. Failure marks the
/// session failed and leaves the fragment for the reclaimer's sweep.
fn spawn_finalize(state: AppState, session: UploadSessionRow, path: PathBuf) {
    tokio::spawn(async move {
        let upload_id = session.upload_id;
        let _guard = state.upload_locks.acquire(upload_id).await;

        let result = async {
            let data = tokio::fs::read(&path)
                .await
                .map_err(|e| ApiError::Internal(format!("cannot read assembled upload: {e}")))?;
            state
                .files
                .upload(
                    session.user_id,
                    &session.filename,
                    session.declared_size as u64,
                    Bytes::from(data),
                )
                .await
        }
        .await;

        match result {
            Ok(record) => {
                let _ = tokio::fs::remove_file(&path).await;
                if let Err(e) = state.metadata.delete_upload_session(upload_id).await {
                    tracing::warn!(upload_id = %upload_id, error = %e, "failed to drop completed upload session");
                }
                drop(_guard);
                state.upload_locks.release(upload_id).await;
                tracing::info!(
                    upload_id = %upload_id,
                    file_id = %record.file_id,
                    "resumable upload finalized"
                );
            }
            Err(e) => {
                tracing::error!(upload_id = %upload_id, error = %e, "upload finalize failed");
                let now = OffsetDateTime::now_utc();
                if let Err(state_err) = state
                    .metadata
                    .set_upload_state(upload_id, UploadState::Failed.as_str(), now)
                    .await
                {
                    tracing::error!(
                        upload_id = %upload_id,
                        error = %state_err,
                        "failed to mark upload session failed"
                    );
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_parses_pairs_and_bare_keys() {
        let encoded_name = BASE64.encode("report.pdf");
        let header = format!("filename {encoded_name},is_confidential");
        let meta = parse_metadata(&header);
        assert_eq!(meta.get("filename").unwrap(), "report.pdf");
        assert_eq!(meta.get("is_confidential").unwrap(), "");
    }

    #[test]
    fn metadata_skips_undecodable_values() {
        let meta = parse_metadata("filename not-base64!!!,other aGk=");
        assert!(!meta.contains_key("filename"));
        assert_eq!(meta.get("other").unwrap(), "hi");
    }

    #[tokio::test]
    async fn upload_locks_serialize_by_id() {
        let locks = UploadLocks::default();
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        let locks2 = locks.clone();
        let contender = tokio::spawn(async move { locks2.acquire(id).await });

        // The contender cannot acquire while the guard is held.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }
}
