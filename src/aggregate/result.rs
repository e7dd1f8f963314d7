//! Aggregation outcome types.
//!
//! An aggregation always ends in one of two shapes: a merged payload or a
//! structured error. Both are immutable once built.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::resilience::CallFailure;

/// Headline when a guarded call failed (transport, timeout, open breaker).
pub const CALL_FAILED_MESSAGE: &str = "API call failed or circuit breaker opened";

/// Headline when every call completed but an upstream reported non-2xx.
pub const STATUS_FAILED_MESSAGE: &str = "One of the API responses failed.";

/// Headline when an upstream payload lacks the field it must contribute.
pub const MISSING_FIELD_MESSAGE: &str = "Upstream response is missing a required field";

/// Fields extracted from every upstream payload, keyed by output name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregatedPayload(Map<String, Value>);

impl AggregatedPayload {
    pub(crate) fn insert(&mut self, field: &str, value: &str) {
        self.0.insert(field.to_string(), Value::String(value.to_string()));
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Why an aggregation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationError {
    /// Human-readable headline.
    pub message: String,
    /// Upstream that triggered the failure.
    pub upstream: String,
    /// The triggering cause.
    pub cause: CallFailure,
    /// One line naming the upstream and cause, plus how many other branches failed.
    pub cause_summary: String,
}

impl AggregationError {
    pub(crate) fn call(upstream: &str, cause: CallFailure, other_failures: usize) -> Self {
        Self::new(CALL_FAILED_MESSAGE, upstream, cause, other_failures)
    }

    pub(crate) fn status(upstream: &str, status: u16) -> Self {
        let cause = CallFailure::upstream(format!("responded with status {}", status));
        Self::new(STATUS_FAILED_MESSAGE, upstream, cause, 0)
    }

    pub(crate) fn missing_field(upstream: &str, field: &str) -> Self {
        let cause = CallFailure::upstream(format!("field '{}' missing or not a string", field));
        Self::new(MISSING_FIELD_MESSAGE, upstream, cause, 0)
    }

    fn new(message: &str, upstream: &str, cause: CallFailure, other_failures: usize) -> Self {
        let mut cause_summary = format!("{}: {}", upstream, cause);
        if other_failures > 0 {
            cause_summary.push_str(&format!(" (+{} more)", other_failures));
        }
        Self {
            message: message.to_string(),
            upstream: upstream.to_string(),
            cause,
            cause_summary,
        }
    }
}

/// Outcome of one `/aggregate` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationResult {
    Merged(AggregatedPayload),
    Failed(AggregationError),
}

impl AggregationResult {
    /// Metrics label: `merged` or the triggering failure kind.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Merged(_) => "merged",
            Self::Failed(err) => err.cause.kind(),
        }
    }
}
