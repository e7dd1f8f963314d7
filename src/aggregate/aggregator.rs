//! Concurrent fan-out and join.
//!
//! Every branch is started before any is awaited and all of them settle
//! before the outcome is decided; a failed branch does not cancel its
//! siblings. When several branches fail, the first-declared failing branch
//! is reported so the response does not depend on completion order.

use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;

use crate::aggregate::result::{AggregatedPayload, AggregationError, AggregationResult};
use crate::config::UpstreamConfig;
use crate::resilience::{BreakerRegistry, CallFailure, CircuitBreaker};
use crate::upstream::{CallOutcome, GuardedCall, RequestSpec, UpstreamClient, UpstreamResponse};

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("no circuit breaker registered for upstream '{0}'")]
    MissingBreaker(String),

    #[error("no upstreams configured")]
    NoBranches,
}

/// One fan-out branch: which upstream to call and which field it contributes.
#[derive(Debug, Clone)]
pub struct Branch {
    pub upstream: String,
    pub breaker: Arc<CircuitBreaker>,
    pub request: RequestSpec,
    pub source_field: String,
    pub output_field: String,
}

impl Branch {
    fn guarded_call(&self) -> GuardedCall {
        GuardedCall::new(self.breaker.clone(), self.request.clone())
    }
}

/// Fans one inbound request out to every branch and merges the results.
pub struct Aggregator {
    branches: Vec<Branch>,
    client: Arc<dyn UpstreamClient>,
}

impl Aggregator {
    pub fn new(branches: Vec<Branch>, client: Arc<dyn UpstreamClient>) -> Result<Self, AggregatorError> {
        if branches.is_empty() {
            return Err(AggregatorError::NoBranches);
        }
        Ok(Self { branches, client })
    }

    /// Build branches in declaration order, each bound to its registered breaker.
    pub fn from_config(
        upstreams: &[UpstreamConfig],
        registry: &BreakerRegistry,
        client: Arc<dyn UpstreamClient>,
    ) -> Result<Self, AggregatorError> {
        let branches = upstreams
            .iter()
            .map(|upstream| {
                let breaker = registry
                    .get(&upstream.name)
                    .ok_or_else(|| AggregatorError::MissingBreaker(upstream.name.clone()))?;
                Ok(Branch {
                    upstream: upstream.name.clone(),
                    breaker,
                    request: RequestSpec {
                        url: upstream.url.clone(),
                        timeout: upstream.request_timeout(),
                    },
                    source_field: upstream.source_field.clone(),
                    output_field: upstream.output_field.clone(),
                })
            })
            .collect::<Result<Vec<_>, AggregatorError>>()?;

        Self::new(branches, client)
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Run every guarded call concurrently and decide the aggregate outcome.
    ///
    /// Each call runs on its own task, so it settles and is recorded by its
    /// breaker even if the caller stops waiting.
    pub async fn aggregate(&self) -> AggregationResult {
        let calls = self.branches.iter().map(|branch| {
            let call = branch.guarded_call();
            let client = self.client.clone();
            tokio::spawn(async move { call.run(client.as_ref()).await })
        });

        let outcomes = join_all(calls)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| Err(CallFailure::upstream(format!("guarded call aborted: {}", e))))
            })
            .collect();
        self.settle(outcomes)
    }

    fn settle(&self, outcomes: Vec<CallOutcome>) -> AggregationResult {
        let mut responses: Vec<(&Branch, UpstreamResponse)> = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();

        for (branch, outcome) in self.branches.iter().zip(outcomes) {
            match outcome {
                Ok(response) => responses.push((branch, response)),
                Err(failure) => {
                    tracing::warn!(
                        upstream = %branch.upstream,
                        kind = failure.kind(),
                        error = %failure,
                        "Upstream call failed"
                    );
                    failures.push((branch, failure));
                }
            }
        }

        let mut failures = failures.into_iter();
        if let Some((branch, failure)) = failures.next() {
            let others = failures.len();
            return AggregationResult::Failed(AggregationError::call(&branch.upstream, failure, others));
        }

        if let Some((branch, response)) = responses.iter().find(|(_, r)| !r.is_success()) {
            tracing::warn!(upstream = %branch.upstream, status = response.status, "Upstream returned non-success status");
            return AggregationResult::Failed(AggregationError::status(&branch.upstream, response.status));
        }

        let mut payload = AggregatedPayload::default();
        for (branch, response) in &responses {
            match response.body.get(&branch.source_field).and_then(|v| v.as_str()) {
                Some(value) => payload.insert(&branch.output_field, value),
                None => {
                    tracing::warn!(upstream = %branch.upstream, field = %branch.source_field, "Upstream payload missing field");
                    return AggregationResult::Failed(AggregationError::missing_field(
                        &branch.upstream,
                        &branch.source_field,
                    ));
                }
            }
        }

        AggregationResult::Merged(payload)
    }
}
