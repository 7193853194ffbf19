//! fftiers-api - Tier clustering HTTP service
//!
//! Loads configuration, starts the cache sweeper, and serves the tier API
//! until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fftiers_api::{build_router, AppState};
use fftiers_common::config::{ConfigOverrides, TomlConfig};
use fftiers_engine::{TierCache, TierService};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Command-line arguments for fftiers-api
#[derive(Parser, Debug)]
#[command(name = "fftiers-api")]
#[command(about = "Fantasy football tier clustering service")]
#[command(version)]
struct Args {
    /// Config file (overrides FFTIERS_CONFIG and the platform default)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(&ConfigOverrides {
        config_path: args.config,
        port: args.port,
        log_level: args.log_level,
    })
    .context("Failed to load configuration")?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting fftiers-api v{} (log level {})",
        env!("CARGO_PKG_VERSION"),
        config.logging.level
    );

    let cache = Arc::new(TierCache::new(Duration::from_secs(config.cache.ttl_secs)));
    let shutdown = CancellationToken::new();
    let sweeper = Arc::clone(&cache).spawn_sweeper(
        Duration::from_secs(config.cache.sweep_interval_secs),
        shutdown.clone(),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState::new(TierService::new(cache), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("fftiers-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        error!("Cache sweeper task failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
