//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the aggregation gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream services fanned out to by `/aggregate`, in declaration order.
    pub upstreams: Vec<UpstreamConfig>,

    /// Outbound HTTP client settings shared by all upstreams.
    pub client: ClientConfig,

    /// Inbound request timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstreams: vec![
                UpstreamConfig::new(
                    "posts",
                    "https://jsonplaceholder.typicode.com/posts/1",
                    "title",
                    "post_title",
                ),
                UpstreamConfig::new(
                    "users",
                    "https://jsonplaceholder.typicode.com/users/1",
                    "name",
                    "author_name",
                ),
            ],
            client: ClientConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// One upstream dependency: where to call, what to extract, how to guard it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Upstream identifier. Also names the circuit breaker guarding it.
    pub name: String,

    /// Absolute URL fetched with GET.
    pub url: String,

    /// String field read from the upstream JSON object.
    pub source_field: String,

    /// Field name the extracted value is written under in the merged payload.
    pub output_field: String,

    /// Call-local request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Circuit breaker guarding this upstream.
    #[serde(default)]
    pub breaker: BreakerConfig,
}

impl UpstreamConfig {
    /// Create an upstream entry with default timeout and breaker settings.
    pub fn new(name: &str, url: &str, source_field: &str, output_field: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            source_field: source_field.to_string(),
            output_field: output_field.to_string(),
            request_timeout_ms: default_request_timeout_ms(),
            breaker: BreakerConfig::default(),
        }
    }

    /// Call-local request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

/// Circuit breaker settings for a single upstream.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures at which the breaker opens.
    pub max_failures: u32,

    /// Bound on a guarded operation, in milliseconds.
    pub operation_timeout_ms: u64,

    /// Time spent open before a trial call is admitted, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Fail fast on timeout or rejection instead of waiting. Must stay `true`.
    pub fallback_on_failure: bool,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 3,
            operation_timeout_ms: 2_000,
            reset_timeout_ms: 10_000,
            fallback_on_failure: true,
        }
    }
}

impl BreakerConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// User-Agent header sent upstream.
    pub user_agent: String,

    /// Honour HTTP(S)_PROXY environment variables.
    pub system_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            user_agent: concat!("aggregation-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
            system_proxy: true,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on handling one inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount `/admin/*` on the gateway router.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
