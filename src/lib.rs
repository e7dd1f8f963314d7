//! Request-aggregation gateway library.

pub mod admin;
pub mod aggregate;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use aggregate::{AggregationResult, Aggregator};
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{BreakerRegistry, CircuitBreaker};
