//! Structured logging.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Default directives when neither `RUST_LOG` nor a config level is usable.
const DEFAULT_DIRECTIVES: &str = "aggregation_gateway=debug,tower_http=debug";

/// Install the global subscriber.
///
/// `RUST_LOG` wins; otherwise the configured level applies to this crate and
/// tower-http.
pub fn init(config: &ObservabilityConfig) {
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = format!(
            "aggregation_gateway={level},tower_http={level}",
            level = config.log_level
        );
        EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
    })
}
