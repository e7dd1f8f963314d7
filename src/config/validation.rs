//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! rules. Every violation is collected so operators can fix a file in one pass.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, UpstreamConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("at least one upstream must be configured")]
    NoUpstreams,

    #[error("upstream name must not be empty")]
    EmptyName,

    #[error("duplicate upstream name '{0}'")]
    DuplicateName(String),

    #[error("duplicate output field '{0}'")]
    DuplicateOutputField(String),

    #[error("upstream '{name}': invalid url '{url}'")]
    InvalidUrl { name: String, url: String },

    #[error("upstream '{name}': field names must not be empty")]
    EmptyField { name: String },

    #[error("upstream '{name}': {field} must be greater than zero")]
    Zero { name: String, field: &'static str },

    #[error("upstream '{0}': fallback_on_failure cannot be disabled")]
    FallbackDisabled(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error(
        "timeouts.request_secs ({request_secs}s) must exceed the slowest upstream bound \
         ('{upstream}' gives up after {bound_ms}ms)"
    )]
    RequestTimeoutTooShort {
        request_secs: u64,
        upstream: String,
        bound_ms: u64,
    },

    #[error("admin.api_key must not be empty when admin is enabled")]
    EmptyAdminKey,
}

/// Validate a parsed configuration, returning every violation found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::EmptyAdminKey);
    }

    if config.upstreams.is_empty() {
        errors.push(ValidationError::NoUpstreams);
    }

    let mut names = HashSet::new();
    let mut outputs = HashSet::new();
    for upstream in &config.upstreams {
        if !upstream.name.is_empty() && !names.insert(upstream.name.as_str()) {
            errors.push(ValidationError::DuplicateName(upstream.name.clone()));
        }
        if !upstream.output_field.is_empty() && !outputs.insert(upstream.output_field.as_str()) {
            errors.push(ValidationError::DuplicateOutputField(upstream.output_field.clone()));
        }
        validate_upstream(upstream, &mut errors);
    }

    // Every branch must settle before the router-level timeout can fire,
    // otherwise clients see a bare 408 instead of the aggregation error.
    let slowest = config
        .upstreams
        .iter()
        .rev() // ties resolve to the first-declared upstream
        .map(|u| (u, u.request_timeout_ms.min(u.breaker.operation_timeout_ms)))
        .max_by_key(|(_, bound_ms)| *bound_ms);
    if let Some((upstream, bound_ms)) = slowest {
        let request_secs = config.timeouts.request_secs;
        if request_secs > 0 && request_secs.saturating_mul(1_000) <= bound_ms {
            errors.push(ValidationError::RequestTimeoutTooShort {
                request_secs,
                upstream: upstream.name.clone(),
                bound_ms,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_upstream(upstream: &UpstreamConfig, errors: &mut Vec<ValidationError>) {
    let name = &upstream.name;
    if name.is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    match Url::parse(&upstream.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::InvalidUrl {
            name: name.clone(),
            url: upstream.url.clone(),
        }),
    }

    if upstream.source_field.is_empty() || upstream.output_field.is_empty() {
        errors.push(ValidationError::EmptyField { name: name.clone() });
    }

    let zero_checks: [(&'static str, u64); 4] = [
        ("request_timeout_ms", upstream.request_timeout_ms),
        ("breaker.max_failures", u64::from(upstream.breaker.max_failures)),
        ("breaker.operation_timeout_ms", upstream.breaker.operation_timeout_ms),
        ("breaker.reset_timeout_ms", upstream.breaker.reset_timeout_ms),
    ];
    for (field, value) in zero_checks {
        if value == 0 {
            errors.push(ValidationError::Zero { name: name.clone(), field });
        }
    }

    if !upstream.breaker.fallback_on_failure {
        errors.push(ValidationError::FallbackDisabled(name.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.upstreams[1].name = "posts".into();
        config.upstreams[1].url = "ftp://example.com/users/1".into();
        config.upstreams[0].breaker.max_failures = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::BindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::DuplicateName("posts".into())));
        assert!(errors.contains(&ValidationError::InvalidUrl {
            name: "posts".into(),
            url: "ftp://example.com/users/1".into(),
        }));
        assert!(errors.contains(&ValidationError::Zero {
            name: "posts".into(),
            field: "breaker.max_failures",
        }));
    }

    #[test]
    fn test_fallback_cannot_be_disabled() {
        let mut config = GatewayConfig::default();
        config.upstreams[0].breaker.fallback_on_failure = false;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::FallbackDisabled("posts".into())]);
    }

    #[test]
    fn test_requires_upstreams() {
        let mut config = GatewayConfig::default();
        config.upstreams.clear();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoUpstreams]));
    }

    #[test]
    fn test_duplicate_output_field() {
        let mut config = GatewayConfig::default();
        config.upstreams[1].output_field = "post_title".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateOutputField("post_title".into())]);
    }

    #[test]
    fn test_request_timeout_must_exceed_upstream_bounds() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 1;

        // Default bound is min(5000ms request, 2000ms operation).
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::RequestTimeoutTooShort {
                request_secs: 1,
                upstream: "posts".into(),
                bound_ms: 2_000,
            }]
        );

        config.timeouts.request_secs = 2;
        assert!(validate_config(&config).is_err());

        config.timeouts.request_secs = 3;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_request_timeout_uses_slowest_upstream() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 5;
        config.upstreams[1].breaker.operation_timeout_ms = 8_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::RequestTimeoutTooShort {
                request_secs: 5,
                upstream: "users".into(),
                bound_ms: 5_000,
            }]
        );
    }
}
