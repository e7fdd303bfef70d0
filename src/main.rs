//! API Testbed server (v1)
//!
//! A smoke-test backend built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 API TESTBED                  │
//!                     │                                              │
//!   Client Request    │  ┌─────────┐    ┌───────────────────────┐    │
//!   ──────────────────┼─▶│  http   │───▶│ /api/http/* → service │    │
//!                     │  │ server  │    ├───────────────────────┤    │
//!                     │  │         │───▶│ /sse  → timer stream  │    │
//!                     │  │         │    ├───────────────────────┤    │
//!                     │  │         │───▶│ /ws   → echo session  │    │
//!                     │  └─────────┘    └───────────────────────┘    │
//!                     │                                              │
//!                     │ config · observability · security · lifecycle│
//!                     └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use api_testbed::config::resolve_config;
use api_testbed::lifecycle::{signals, Shutdown};
use api_testbed::observability::{logging, metrics};
use api_testbed::HttpServer;

#[derive(Parser)]
#[command(name = "api-testbed")]
#[command(about = "HTTP, SSE and WebSocket smoke-test backend", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "API_TESTBED_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = resolve_config(args.config.as_deref(), args.bind)?;

    logging::init_logging(&config.observability)?;

    tracing::info!("api-testbed v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_file = ?args.config,
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        sse_interval_ms = config.sse.interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    HttpServer::new(config).serve(shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
