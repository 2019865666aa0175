//! Module pipeline server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ Request ──▶ Pipeline ─────────────────────────┐
//!                     (axum/hyper)                 REALLY_FIRST → FIRST → MIDDLE     │
//!                                                  → LAST → REALLY_LAST              │
//!     Client Response                                                                │
//!     ◀────────────── http server ◀── Response ◀────────────────────────────────────┘
//!
//!     Cross-cutting: config (TOML + watcher), lifecycle (host, startup,
//!     shutdown), observability (tracing, Prometheus)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use module_pipeline::config::{load_config, ConfigWatcher, ServerConfig};
use module_pipeline::lifecycle::shutdown::stop_modules;
use module_pipeline::lifecycle::{build_pipeline, Shutdown};
use module_pipeline::observability::{logging, metrics};
use module_pipeline::PipelineServer;

#[derive(Debug, Parser)]
#[command(name = "module-pipeline", version, about = "Staged HTTP request pipeline")]
struct Cli {
    /// TOML configuration file. Without one, the built-in module set is used.
    #[arg(short, long, env = "PIPELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::with_default_modules(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "module-pipeline starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        modules = config.modules.len(),
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let host = build_pipeline(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher must outlive the server; dropping it stops notifications.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let shutdown = Shutdown::new();
    let server = PipelineServer::new(host.pipeline().clone(), &config.listener);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    stop_modules(&host);
    tracing::info!("Shutdown complete");
    Ok(())
}
