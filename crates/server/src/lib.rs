//! HTTP server for the Coffre encrypted file vault.
//!
//! This crate provides the control plane and the business services:
//! - Registration, login, and bearer-token auth
//! - The file service (dedup upload pipeline, download, soft delete)
//! - The share service (pickup codes, gates, save-to-vault)
//! - The resumable upload front-end
//! - The background reclaimer (GC, lifecycle, scheduler)

pub mod auth;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod range;
pub mod routes;
pub mod services;
pub mod state;
pub mod tasks;
pub mod tus;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
