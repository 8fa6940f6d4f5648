//! Storefront gate server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ request gate ─▶ cors/limits ─▶ api handler
//!                                            │                               │
//!                                            │ block list                    │ extractors
//!                                            │ sliding window                ▼
//!                                            │                        token authority ─▶ identity store
//!                                            ▼
//!     Client Response ◀──── defensive headers on every response
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use storefront_gate::config;
use storefront_gate::lifecycle::{self, Shutdown};
use storefront_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "storefront-gate")]
#[command(about = "Storefront API with token authority and request gate", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "STOREFRONT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();

    let config = config::load(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "storefront-gate starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (server, listener) = lifecycle::start(config).await?;

    let shutdown = Arc::new(Shutdown::new());
    let rx = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        lifecycle::wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
