//! Coffre server binary.

use anyhow::{Context, Result};
use clap::Parser;
use coffre_core::config::AppConfig;
use coffre_crypto::Kek;
use coffre_server::tasks::{GarbageCollector, LifecycleSweep, Scheduler};
use coffre_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Coffre - an encrypted file vault server
#[derive(Parser, Debug)]
#[command(name = "coffred")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "COFFRE_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Coffre v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration: an optional TOML file with env var overrides.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::info!("No config file at {}, using environment variables", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("COFFRE_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("configuration invalid")?;

    // The master key is non-negotiable: without it no stored DEK can ever
    // be unwrapped again.
    let kek_bytes = config
        .crypto
        .master_key
        .resolve()
        .context("failed to resolve master key")?;
    let kek = Kek::from_bytes(kek_bytes);
    if config.crypto.jwt_secret.is_empty() {
        anyhow::bail!("crypto.jwt_secret must be configured");
    }
    tracing::info!("Master key loaded");

    // Blob storage, verified reachable before accepting requests.
    let blobs = coffre_storage::from_config(&config.storage)
        .await
        .context("failed to initialize blob storage")?;
    blobs
        .health_check()
        .await
        .context("blob storage health check failed")?;
    tracing::info!(backend = blobs.backend_name(), "Blob storage initialized");

    // Metadata store.
    let metadata = coffre_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    // Resumable upload temp directory.
    tokio::fs::create_dir_all(&config.server.upload_dir)
        .await
        .context("failed to create upload directory")?;

    let bind = config.server.bind.clone();
    let gc_config = config.gc.clone();
    let upload_dir = config.server.upload_dir.clone();
    let state = AppState::new(config, metadata.clone(), blobs.clone(), kek);

    // Background reclaimer. A scheduler failure is logged, not fatal: the
    // serving path does not depend on it.
    if gc_config.enabled {
        let scheduler = Arc::new(Scheduler::new(
            GarbageCollector::new(metadata, blobs, upload_dir, gc_config.clone()),
            LifecycleSweep::new(state.metadata.clone()),
            gc_config,
        ));
        scheduler.start().await;
    } else {
        tracing::warn!("background reclaimer disabled by configuration");
    }

    let app = create_router(state);
    let addr: SocketAddr = bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
