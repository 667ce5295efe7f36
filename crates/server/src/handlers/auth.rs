//! Authentication endpoints.

use crate::auth::CurrentUser;
use crate::envelope::{Envelope, ok, ok_empty};
use crate::error::ApiResult;
use crate::handlers::audit;
use crate::handlers::dto::UserDto;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserDto,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<Envelope<AuthResponse>>> {
    let outcome = state
        .users
        .register(&req.email, &req.password, req.invite_code.as_deref())
        .await?;

    audit(&state, Some(outcome.user.user_id), "register", None);
    Ok(ok(AuthResponse {
        token: outcome.token,
        user: UserDto::from(&outcome.user),
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Envelope<AuthResponse>>> {
    let outcome = state.users.login(&req.email, &req.password).await?;

    audit(&state, Some(outcome.user.user_id), "login", None);
    Ok(ok(AuthResponse {
        token: outcome.token,
        user: UserDto::from(&outcome.user),
    }))
}

/// POST /api/auth/logout
///
/// Bearer tokens are stateless; logout is the client dropping its token.
pub async fn logout() -> Json<Envelope<()>> {
    ok_empty()
}

/// GET /api/user/me
pub async fn me(user: CurrentUser) -> Json<Envelope<UserDto>> {
    ok(UserDto::from(&user.user))
}
