//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use crate::tus;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, head, options, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // The multipart and chunk bodies must fit the configured file limit,
    // plus slack for multipart framing.
    let body_limit = state.config.business.max_file_size as usize + 1024 * 1024;

    let api_routes = Router::new()
        // Auth
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/user/me", get(handlers::auth::me))
        // Files
        .route(
            "/api/files",
            get(handlers::files::list_files).post(handlers::files::create_file),
        )
        .route("/api/files/check", post(handlers::files::check_instant))
        .route("/api/files/upload", post(handlers::files::upload_file))
        .route(
            "/api/files/{file_id}/download",
            get(handlers::files::download_file),
        )
        .route("/api/files/{file_id}", delete(handlers::files::delete_file))
        // Shares
        .route(
            "/api/shares",
            post(handlers::shares::create_share).get(handlers::shares::list_shares),
        )
        // One param name for both: the router requires consistent naming
        // at the same path position.
        .route("/api/shares/{id}/save", post(handlers::shares::save_to_vault))
        .route("/api/shares/{id}", delete(handlers::shares::stop_share))
        // Anonymous pickup
        .route("/api/public/shares/{code}", post(handlers::public::get_share))
        .route("/api/public/download/{code}", get(handlers::public::download))
        // Resumable upload protocol
        .route(
            "/api/tus/upload",
            options(tus::options_upload).post(tus::create_upload),
        )
        .route(
            "/api/tus/upload/{upload_id}",
            head(tus::head_upload)
                .patch(tus::append_chunk)
                .delete(tus::delete_upload)
                .options(tus::options_upload),
        )
        // Health (unauthenticated)
        .route("/health", get(handlers::health::health_check));

    api_routes
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
