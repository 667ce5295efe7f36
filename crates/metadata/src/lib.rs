//! Relational metadata store for the Coffre file vault.
//!
//! Users, deduplicated blobs with reference counts, user-scoped file
//! records with soft-delete tombstones, share sessions, resumable upload
//! sessions, the audit log, and system settings. Multi-entity operations
//! are single transactions; counters move via atomic SQL expressions.

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use store::{MetadataStore, SqliteStore};

use coffre_core::config::MetadataConfig;
use std::sync::Arc;

/// Construct a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store))
        }
        MetadataConfig::Postgres {
            host,
            port,
            user,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = PostgresStore::from_params(
                host,
                *port,
                user.as_deref(),
                password.as_deref(),
                database,
                *ssl_mode,
                *max_connections,
                *statement_timeout_ms,
            )
            .await?;
            Ok(Arc::new(store))
        }
    }
}
