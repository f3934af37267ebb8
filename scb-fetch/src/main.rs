//! scb-fetch - Sheet data fetch service for chart blocks
//!
//! Reads label, stat, badge and overlay columns from a spreadsheet in one
//! batched request, normalizes them into row-aligned series, and caches the
//! result per chart block.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scb_common::config::{self, CacheBackend, TomlConfig};
use scb_fetch::cache::ResultCache;
use scb_fetch::provider::GoogleSheetsClient;
use scb_fetch::services::{BatchFetchOrchestrator, FetchCoordinator, PipelineSettings};
use scb_fetch::store::{BlobStore, FileBlobStore, MemoryBlobStore, SqliteBlobStore};
use scb_fetch::{build_router, AppState};

const MODULE_NAME: &str = "scb-fetch";

/// Command-line arguments for scb-fetch
#[derive(Parser, Debug)]
#[command(name = "scb-fetch")]
#[command(about = "Sheet data fetch and cache service for chart blocks")]
#[command(version)]
struct Args {
    /// Config file (default: discovered under the user/system config dirs)
    #[arg(short, long, env = "SCB_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "SCB_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(long, env = "SCB_HOST")]
    host: Option<String>,

    /// Cache directory for the file backend (overrides config)
    #[arg(long, env = "SCB_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Google API key (overrides config)
    #[arg(long, env = "SCB_GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,

    /// Google OAuth access token (overrides config)
    #[arg(long, env = "SCB_GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    google_access_token: Option<String>,
}

impl Args {
    fn apply(self, config: &mut TomlConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(dir) = self.cache_dir {
            config.cache.dir = Some(dir);
        }
        if let Some(key) = self.google_api_key {
            config.google.api_key = Some(key);
        }
        if let Some(token) = self.google_access_token {
            config.google.access_token = Some(token);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = config::load_or_default(args.config.as_deref(), MODULE_NAME)
        .context("Failed to load configuration")?;
    args.apply(&mut config);

    // RUST_LOG wins over the configured level
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("scb_fetch={level},scb_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} v{}", MODULE_NAME, env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({}, {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let store = open_store(&config).await?;
    let settings =
        PipelineSettings::from_config(&config.pipeline).context("Invalid pipeline configuration")?;
    info!(
        badge_column = ?settings.badge_column,
        row_domain_source = ?settings.row_domain_source,
        timeout_secs = settings.provider_timeout.as_secs(),
        "Pipeline configured"
    );

    let provider = GoogleSheetsClient::new(&config.google, settings.provider_timeout)
        .context("Failed to create Google Sheets client")?;

    let coordinator = FetchCoordinator::new(
        BatchFetchOrchestrator::new(Arc::new(provider), settings),
        ResultCache::new(store),
    );
    let app = build_router(AppState::new(coordinator));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Open the configured cache backend
async fn open_store(config: &TomlConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.cache.backend {
        CacheBackend::File => {
            let dir = config.cache.resolved_dir();
            info!("Cache directory: {}", dir.display());
            Arc::new(
                FileBlobStore::open(dir)
                    .await
                    .context("Failed to open cache directory")?,
            )
        }
        CacheBackend::Sqlite => {
            let path = config.cache.resolved_database_path();
            info!("Cache database: {}", path.display());
            Arc::new(
                SqliteBlobStore::open(&path)
                    .await
                    .context("Failed to open cache database")?,
            )
        }
        CacheBackend::Memory => {
            warn!("In-memory cache selected; cached data is lost on restart");
            Arc::new(MemoryBlobStore::new())
        }
    };
    Ok(store)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
