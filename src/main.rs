//! Super-info aggregation service.
//!
//! One endpoint, `GET /api/super-info?country=<name>`, combining a country
//! record with weather, trivia, a dictionary word and an exchange rate.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http (router, CORS, request ID, trace)
//!                        │
//!                        ▼
//!                    aggregate::Aggregator
//!                        │ validate → security (rate limit) → cache
//!                        ▼
//!                    upstream::UpstreamApi
//!                        │ countries, then weather ∥ trivia ∥ dictionary ∥ exchange
//!                        ▼
//!                    resilience (breaker → retry loop → per-attempt timeout)
//!                        │
//!                        ▼
//!                    External APIs
//!
//!     Cross-cutting: config, observability, health probe, lifecycle
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use super_info::config::{load_config, ServiceConfig};
use super_info::observability::{logging, metrics};
use super_info::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "super-info")]
#[command(about = "Aggregating country information service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("super-info v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit_enabled = config.rate_limit.enabled,
        cache_ttl_ms = config.cache.ttl_ms,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
