//! qrat-px - forwarding proxy for the attendance service

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use qrat_common::config::{resolve, TomlConfig, ENV_BIND, ENV_LOG_LEVEL, ENV_UPSTREAM_URL};
use qrat_px::{build_router, AppState, UpstreamClient};
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "qrat-px")]
#[command(about = "Forwarding proxy for the QRAT attendance service")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/qrat/config.toml)
    #[arg(short, long, env = "QRAT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5731
    #[arg(short, long)]
    bind: Option<String>,

    /// Attendance service base URL
    #[arg(short, long)]
    upstream_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) =
        TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load config")?;

    let log_level = resolve(
        args.log_level,
        ENV_LOG_LEVEL,
        Some(config.logging.level.clone()),
        "info".to_string(),
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=debug", log_level).into()),
        )
        .init();

    info!(
        "Starting QRAT proxy (qrat-px) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    source.log();

    let bind = resolve(
        args.bind,
        ENV_BIND,
        Some(config.proxy.bind_address.clone()),
        config.proxy.bind_address.clone(),
    );
    let upstream_url = resolve(
        args.upstream_url,
        ENV_UPSTREAM_URL,
        Some(config.upstream.base_url.clone()),
        config.upstream.base_url.clone(),
    );

    let upstream = UpstreamClient::new(
        upstream_url,
        Duration::from_secs(config.upstream.timeout_secs),
    )
    .context("Failed to build HTTP client")?;
    info!("Attendance service: {}", upstream.base_url());

    let app = build_router(AppState::new(upstream, config.duplicate_phrases.clone()));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("qrat-px listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
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
