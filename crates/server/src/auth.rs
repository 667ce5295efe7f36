//! Authentication middleware and the current-user extractor.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use coffre_metadata::models::UserRow;

/// The authenticated caller, attached as a request extension once the
/// bearer token verifies and the account is active.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: UserRow,
}

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.user_id
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> ApiResult<Self> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}

/// Extract bearer token from the Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(&v[7..])
            } else {
                None
            }
        })
}

/// Authentication middleware.
///
/// Verifies the bearer token, loads the account, and attaches it for the
/// `CurrentUser` extractor. A missing or bad token is not an error here —
/// public endpoints share the router — but a token for a disabled account
/// is rejected outright.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_bearer_token(&req) {
        if let Ok(claims) = state.users.verify_token(token) {
            if let Some(user) = state.metadata.get_user(claims.user_id()?).await? {
                if !user.is_active() {
                    return Err(ApiError::Forbidden("account is disabled".to_string()));
                }
                req.extensions_mut().insert(CurrentUser { user });
            }
        }
    }

    Ok(next.run(req).await)
}
