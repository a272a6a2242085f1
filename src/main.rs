//! grabid (v0.1)
//!
//! A proxying content streamer built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                    GRABID                      │
//!   Client Request     │  ┌─────────┐   ┌───────────┐   ┌────────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ security  │──▶│  handlers  │  │
//!                      │  │ server  │   │token/rate │   │probe/stream│  │
//!                      │  └─────────┘   └───────────┘   └─────┬──────┘  │
//!                      │                                      │         │
//!   Relayed Body       │  ┌──────────┐                  ┌─────▼──────┐  │
//!   ◀──────────────────┼──│ response │◀─────────────────│  upstream  │◀─┼── Remote
//!                      │  │capped    │                  │   client   │  │   Source
//!                      │  └──────────┘                  └────────────┘  │
//!                      │                                                │
//!                      │  config · observability · lifecycle            │
//!                      └────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use grabid::config::load_config;
use grabid::http::HttpServer;
use grabid::lifecycle::{signals::spawn_signal_handler, Shutdown};
use grabid::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser)]
#[command(name = "grabid")]
#[command(about = "Proxying content streamer", long_about = None)]
struct Args {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "GRAB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    init_logging(&config.observability)?;
    tracing::info!("grabid v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        port = config.listener.port,
        max_size = %config.limits.max_size_label(),
        max_concurrent = config.limits.max_concurrent,
        rate_limit = %config.rate_limit.limit,
        "Configuration loaded"
    );

    // Metrics server
    let metrics_address = config.observability.metrics_address.trim();
    if !metrics_address.is_empty() {
        match metrics_address.parse::<SocketAddr>() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(server.config().listener.socket_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
