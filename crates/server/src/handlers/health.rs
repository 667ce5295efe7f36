//! Liveness endpoint.

use crate::envelope::{Envelope, ok};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub storage: &'static str,
}

/// GET /health - intentionally unauthenticated for load balancer probes.
pub async fn health_check(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<HealthResponse>>> {
    state
        .metadata
        .health_check()
        .await
        .map_err(|e| ApiError::Internal(format!("database unhealthy: {e}")))?;
    state
        .blobs
        .health_check()
        .await
        .map_err(|e| ApiError::Internal(format!("storage unhealthy: {e}")))?;

    Ok(ok(HealthResponse {
        status: "ok",
        database: "up",
        storage: "up",
    }))
}
