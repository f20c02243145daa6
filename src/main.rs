//! Product catalog server.
//!
//! ```text
//!     Client ──▶ http (router, request id, trace, timeout)
//!                  │
//!                  ▼
//!              service ──▶ rate limiter        (list)
//!                  │   ──▶ breaker ▸ retry     (get by id)
//!                  │   ──▶ existence check     (update, delete)
//!                  ▼
//!                store
//!
//!     any failure ──▶ classifier ──▶ { status, messages }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use product_catalog::config::load_config;
use product_catalog::observability::{logging, metrics};
use product_catalog::{CatalogConfig, HttpServer, InMemoryStore, Shutdown};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Product catalog HTTP service", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => CatalogConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = ?args.config,
        "product-catalog starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        list_limit = config.rate_limit.limit_for_period,
        retry_attempts = config.retries.max_attempts,
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
    let server = HttpServer::new(config, Arc::new(InMemoryStore::new()));
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
