//! Failure taxonomy shared by the breaker, guarded calls and the aggregator.

use std::time::Duration;

use thiserror::Error;

/// Which clock expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutScope {
    /// The breaker's `operation_timeout`.
    Operation,
    /// The guarded call's own request timeout.
    Request,
}

impl std::fmt::Display for TimeoutScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operation => write!(f, "operation"),
            Self::Request => write!(f, "request"),
        }
    }
}

/// Why a guarded call did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    /// Transport-level failure from a live call (connection refused, reset, bad body...).
    #[error("upstream error: {cause}")]
    UpstreamError { cause: String },

    /// One of the two bounds elapsed.
    #[error("{scope} timed out after {}ms", .after.as_millis())]
    Timeout { scope: TimeoutScope, after: Duration },

    /// Admission denied; no network call was attempted.
    #[error("circuit breaker '{breaker}' is open")]
    BreakerOpen { breaker: String },
}

impl CallFailure {
    pub fn upstream(cause: impl std::fmt::Display) -> Self {
        Self::UpstreamError {
            cause: cause.to_string(),
        }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamError { .. } => "upstream_error",
            Self::Timeout { .. } => "timeout",
            Self::BreakerOpen { .. } => "breaker_open",
        }
    }
}
