//! Startup orchestration.
//!
//! Subsystems initialize in order: metrics, breakers and aggregator, then
//! the listener. Any error is returned to `main` and ends the process.

use std::error::Error;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Assemble the gateway and serve until a termination signal arrives.
pub async fn run(config: GatewayConfig) -> Result<(), Box<dyn Error>> {
    for upstream in &config.upstreams {
        tracing::info!(
            upstream = %upstream.name,
            url = %upstream.url,
            request_timeout_ms = upstream.request_timeout_ms,
            max_failures = upstream.breaker.max_failures,
            operation_timeout_ms = upstream.breaker.operation_timeout_ms,
            reset_timeout_ms = upstream.breaker.reset_timeout_ms,
            "Upstream configured"
        );
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::trigger_on_signal(shutdown.clone()));

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
