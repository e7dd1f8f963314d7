//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Build the breaker registry and aggregator from configuration
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::aggregate::{AggregationResult, Aggregator, AggregatorError};
use crate::config::{AdminConfig, GatewayConfig};
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::ShutdownListener;
use crate::observability::metrics;
use crate::resilience::BreakerRegistry;
use crate::upstream::{HttpUpstream, UpstreamClient};

/// Errors while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub breakers: Arc<BreakerRegistry>,
    pub admin: AdminConfig,
}

/// HTTP server for the aggregation gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server calling upstreams over HTTP.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let client = Arc::new(HttpUpstream::new(&config.client)?);
        Self::with_client(config, client)
    }

    /// Create a server with a caller-supplied upstream client.
    pub fn with_client(
        config: GatewayConfig,
        client: Arc<dyn UpstreamClient>,
    ) -> Result<Self, ServerError> {
        let breakers = Arc::new(BreakerRegistry::from_upstreams(&config.upstreams));
        let aggregator = Arc::new(Aggregator::from_config(&config.upstreams, &breakers, client)?);

        tracing::info!(
            upstreams = aggregator.branches().len(),
            admin_enabled = config.admin.enabled,
            "Aggregation gateway assembled"
        );

        let state = AppState {
            aggregator,
            breakers,
            admin: config.admin.clone(),
        };
        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/aggregate", get(aggregate_handler))
            .route("/health", get(health_handler));

        if config.admin.enabled {
            router = router.merge(crate::admin::router(state.clone()));
        }

        router
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for serving or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// `GET /aggregate`: fan out, join, render.
async fn aggregate_handler(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let result = state.aggregator.aggregate().await;
    metrics::record_aggregation(result.outcome(), start);

    match &result {
        AggregationResult::Merged(_) => {
            tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Aggregation succeeded");
        }
        AggregationResult::Failed(err) => {
            tracing::warn!(
                upstream = %err.upstream,
                kind = err.cause.kind(),
                cause = %err.cause_summary,
                "Aggregation failed"
            );
        }
    }

    result.into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
