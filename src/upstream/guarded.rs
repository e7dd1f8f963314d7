//! Breaker-guarded upstream calls.
//!
//! A `GuardedCall` is built fresh for every inbound request and consumed by
//! `run`. The request deadline sits inside the breaker's operation deadline,
//! so whichever is shorter decides when the call gives up.

use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::resilience::{CallFailure, CircuitBreaker, TimeoutScope};
use crate::upstream::client::{UpstreamClient, UpstreamResponse};

/// Settled result of a guarded call.
pub type CallOutcome = Result<UpstreamResponse, CallFailure>;

/// Target and call-local timeout of one outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub url: String,
    pub timeout: Duration,
}

/// One breaker-wrapped outbound request.
#[derive(Debug)]
pub struct GuardedCall {
    breaker: Arc<CircuitBreaker>,
    request: RequestSpec,
}

impl GuardedCall {
    pub fn new(breaker: Arc<CircuitBreaker>, request: RequestSpec) -> Self {
        Self { breaker, request }
    }

    /// Execute through the breaker. Issues at most one network call: none
    /// when the breaker denies admission.
    pub async fn run(self, client: &dyn UpstreamClient) -> CallOutcome {
        let request = &self.request;
        let outcome = self
            .breaker
            .execute(|| issue_request(client, request))
            .await;

        let result = match &outcome {
            Ok(_) => "ok",
            Err(failure) => failure.kind(),
        };
        metrics::record_upstream_call(self.breaker.name(), result);
        outcome
    }
}

/// One GET bounded by the request's own timeout.
pub async fn issue_request(client: &dyn UpstreamClient, request: &RequestSpec) -> CallOutcome {
    with_deadline(TimeoutScope::Request, request.timeout, client.get(&request.url)).await
}
