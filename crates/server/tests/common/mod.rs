//! Shared test fixtures.
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use coffre_core::config::AppConfig;
use coffre_crypto::Kek;
use coffre_metadata::{MetadataStore, SqliteStore};
use coffre_server::{AppState, create_router};
use coffre_storage::{BlobStore, MemoryBackend};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Build an AppState over a fresh SQLite store and the in-memory blob
/// backend.
pub async fn test_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();

    let mut config = AppConfig::for_testing();
    config.server.upload_dir = dir.path().join("uploads");
    tokio::fs::create_dir_all(&config.server.upload_dir)
        .await
        .unwrap();

    let metadata: Arc<dyn MetadataStore> = Arc::new(
        SqliteStore::new(dir.path().join("metadata.db"))
            .await
            .unwrap(),
    );
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBackend::new());
    let kek = Kek::from_bytes(config.crypto.master_key.resolve().unwrap());

    let state = AppState::new(config, metadata, blobs, kek);
    (dir, state)
}

/// Build the full router over a fresh test state.
pub async fn test_app() -> (tempfile::TempDir, AppState, Router) {
    let (dir, state) = test_state().await;
    let app = create_router(state.clone());
    (dir, state, app)
}

/// Issue a JSON request and decode the JSON response.
pub async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Issue a raw request, returning status, headers, and body bytes.
pub async fn request_raw(
    app: &Router,
    request: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, bytes::Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Register a user through the API and return their bearer token.
pub async fn register_user(app: &Router, email: &str) -> String {
    let (status, body) = request_json(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({"email": email, "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Build a multipart/form-data body with a single `file` field.
pub fn multipart_body(filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "coffre-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
