//! Aggregation Gateway
//!
//! A single `GET /aggregate` endpoint that fans out to independent upstream
//! services, each behind its own circuit breaker, and merges their answers.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                AGGREGATION GATEWAY               │
//!                         │                                                  │
//!   GET /aggregate        │  ┌────────┐    ┌────────────┐                    │
//!   ──────────────────────┼─▶│  http  │───▶│ aggregator │                    │
//!                         │  │ server │    └─────┬──────┘                    │
//!                         │  └────────┘          │ fan-out (concurrent)      │
//!                         │              ┌───────┴────────┐                  │
//!                         │              ▼                ▼                  │
//!                         │     ┌──────────────┐  ┌──────────────┐           │
//!                         │     │ guarded call │  │ guarded call │           │
//!                         │     │  + breaker   │  │  + breaker   │           │
//!                         │     └──────┬───────┘  └──────┬───────┘           │
//!                         │            │                 │                   │
//!                         └────────────┼─────────────────┼───────────────────┘
//!                                      ▼                 ▼
//!                                 upstream A        upstream B
//! ```

use std::path::PathBuf;

use clap::Parser;

use aggregation_gateway::config::{load_config, GatewayConfig};
use aggregation_gateway::lifecycle::startup;
use aggregation_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "aggregation-gateway")]
#[command(about = "Circuit-breaker protected request aggregation gateway", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        upstreams = config.upstreams.len(),
        "aggregation-gateway starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
