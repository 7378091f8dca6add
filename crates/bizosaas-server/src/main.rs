//! BizOSaaS gateway server
//!
//! Serves the BizOSaaS frontends' API routes:
//! - `/api/brain/*` proxied to the Brain gateway, with named fallbacks
//! - `/api/auth/*` backend-for-frontend auth over the auth service
//! - tenant host routing, and everything else bypassed to the frontend
//!
//! Usage:
//! ```bash
//! # With config file
//! bizosaas-gateway --config gateway.yaml
//!
//! # Or with environment variables
//! BRAIN_API_URL=http://brain:8001 AUTH_SERVICE_URL=http://auth:8007 bizosaas-gateway
//! ```

mod bootstrap;
mod config;

use anyhow::anyhow;
use clap::Parser;
use config::{LogFormat, LoggingConfig, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// BizOSaaS Gateway - API proxy with fallback for the BizOSaaS frontends
#[derive(Parser)]
#[command(name = "bizosaas-gateway", version)]
#[command(about = "BizOSaaS API gateway with per-route fallbacks", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, value_name = "FILE", env = "BIZOSAAS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen host (overrides config and BIZOSAAS_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides config and BIZOSAAS_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (overrides config and BIZOSAAS_LOG_LEVEL)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Validate configuration and fallback fixtures, then exit
    #[arg(long)]
    check: bool,
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .map_err(|e| anyhow!("failed to load {}: {}", path.display(), e))?,
        None => ServerConfig::default(),
    };

    // Env overrides the file, CLI overrides both
    config.merge_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging)?;
    match &cli.config {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("Using default configuration"),
    }

    bootstrap::check_upstream_defaults(&config)?;
    let state = bootstrap::build_state(&config)?;

    if cli.check {
        info!("Configuration OK");
        return Ok(());
    }

    let app = bizosaas_ingress::gateway_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("BizOSaaS gateway listening on http://{}", addr);
    info!("   - Brain proxy:        http://{}/api/brain/{{domain}}/{{resource}}", addr);
    info!("   - Auth:               http://{}/api/auth/login", addr);
    info!("   - Health check:       http://{}/healthz", addr);
    info!("   - Readiness check:    http://{}/readyz", addr);
    info!("   - Prometheus metrics: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
