//! Success response envelope.

use axum::Json;
use serde::Serialize;

/// The JSON envelope every endpoint responds with: `code` is 0 on
/// success; failures carry the HTTP status (see `error::ErrorResponse`).
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        code: 0,
        message: "ok".to_string(),
        data: Some(data),
    })
}

/// Success with no payload.
pub fn ok_empty() -> Json<Envelope<()>> {
    Json(Envelope {
        code: 0,
        message: "ok".to_string(),
        data: None,
    })
}
