//! Embedding gateway (v1)
//!
//! A transforming HTTP proxy built with Tokio and Axum. It fetches a target
//! site, strips its framing restrictions and rewrites its URLs so the whole
//! site keeps working inside an iframe.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────────┐
//!                          │                  EMBED PROXY                      │
//!                          │                                                   │
//!     Browser Request      │  ┌─────────┐    ┌──────────┐    ┌─────────────┐   │
//!     ─────────────────────┼─▶│  http   │───▶│  proxy   │───▶│  upstream   │───┼──▶ Target
//!                          │  │ server  │    │  target  │    │   client    │   │    Site
//!                          │  └─────────┘    └──────────┘    └──────┬──────┘   │
//!                          │                                        │          │
//!                          │                                        ▼          │
//!     Browser Response     │  ┌─────────┐    ┌──────────┐    ┌─────────────┐   │
//!     ◀────────────────────┼──│ headers │◀───│ rewrite  │◀───│  classify   │◀──┼──── Target
//!                          │  │sanitize │    │ html/css │    │content type │   │
//!                          │  └─────────┘    └──────────┘    └─────────────┘   │
//!                          │                                                   │
//!                          │  ┌─────────────────────────────────────────────┐  │
//!                          │  │            Cross-Cutting Concerns           │  │
//!                          │  │  config · observability · resilience ·      │  │
//!                          │  │  security limits · lifecycle                │  │
//!                          │  └─────────────────────────────────────────────┘  │
//!                          └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use embed_proxy::config::watcher::ConfigWatcher;
use embed_proxy::config::{load_config, GatewayConfig};
use embed_proxy::lifecycle::wait_for_signal;
use embed_proxy::observability::{logging, metrics};
use embed_proxy::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "embed-proxy", version, about = "Transforming proxy for embedding third-party sites")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload the configuration file when it changes
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!("embed-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_concurrent_requests = config.listener.max_concurrent_requests,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        max_rewrite_bytes = config.limits.max_rewrite_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher must stay alive for events to keep arriving.
    let (_watcher, updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), Some(updates))
        }
        _ => (None, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(signal, "Termination signal received");
        trigger.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, updates, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
