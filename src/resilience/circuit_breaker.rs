//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: upstream assumed down, calls fail fast
//! - Half-Open: one probe call tests whether the upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= max_failures
//! Open → Half-Open: first call after reset_timeout (admitted as the trial)
//! Half-Open → Closed: trial succeeds
//! Half-Open → Open: trial fails, is abandoned, or times out
//! ```
//!
//! Admission and every state update happen under one mutex per breaker. The
//! lock is never held across an `.await`.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::failure::{CallFailure, TimeoutScope};
use crate::resilience::timeouts::with_deadline;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of a breaker, for admin endpoints and logs.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub max_failures: u32,
    /// Milliseconds since the breaker last opened, while open.
    pub open_for_ms: Option<u64>,
    pub total_calls: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_rejections: u64,
}

#[derive(Debug, Default)]
struct Counters {
    calls: u64,
    successes: u64,
    failures: u64,
    rejections: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    counters: Counters,
}

/// Per-upstream circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    max_failures: u32,
    operation_timeout: Duration,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: &BreakerConfig) -> Self {
        let name = name.into();
        metrics::record_breaker_state(&name, CircuitState::Closed);
        Self {
            name,
            max_failures: config.max_failures.max(1),
            operation_timeout: config.operation_timeout(),
            reset_timeout: config.reset_timeout(),
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                trial_in_flight: false,
                counters: Counters::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored state. An open breaker whose reset timeout has elapsed still
    /// reports `Open` until the next call is admitted as the trial.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            max_failures: self.max_failures,
            open_for_ms: inner
                .opened_at
                .map(|at| at.elapsed().as_millis() as u64),
            total_calls: inner.counters.calls,
            total_successes: inner.counters.successes,
            total_failures: inner.counters.failures,
            total_rejections: inner.counters.rejections,
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// A denied call returns `BreakerOpen` without invoking `operation`.
    /// An admitted call is bounded by the operation timeout; expiry counts as
    /// a failure exactly like an error returned by the operation.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, CallFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallFailure>>,
    {
        let admission = self.admit()?;

        let outcome =
            with_deadline(TimeoutScope::Operation, self.operation_timeout, operation()).await;

        match &outcome {
            Ok(_) => admission.succeed(),
            Err(failure) => admission.fail(failure),
        }
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // State stays consistent even if a holder panicked; every update is a
        // handful of field writes.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Result<Admission<'_>, CallFailure> {
        let mut inner = self.lock();
        inner.counters.calls += 1;

        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                let reset_elapsed = inner
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.reset_timeout);
                if !reset_elapsed {
                    return Err(self.reject(&mut inner));
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.trial_in_flight = true;
                true
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return Err(self.reject(&mut inner));
                }
                inner.trial_in_flight = true;
                true
            }
        };

        Ok(Admission {
            breaker: self,
            trial,
            settled: false,
        })
    }

    fn reject(&self, inner: &mut BreakerInner) -> CallFailure {
        inner.counters.rejections += 1;
        tracing::debug!(breaker = %self.name, state = %inner.state, "Call rejected by circuit breaker");
        CallFailure::BreakerOpen {
            breaker: self.name.clone(),
        }
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        inner.counters.successes += 1;

        if trial {
            inner.trial_in_flight = false;
            if inner.state == CircuitState::HalfOpen {
                self.transition(&mut inner, CircuitState::Closed);
            }
        } else if inner.state == CircuitState::Closed {
            inner.failure_count = 0;
        }
    }

    fn on_failure(&self, trial: bool, failure: &CallFailure) {
        let mut inner = self.lock();
        inner.counters.failures += 1;

        if trial {
            inner.trial_in_flight = false;
            if inner.state == CircuitState::HalfOpen {
                tracing::warn!(breaker = %self.name, error = %failure, "Trial call failed");
                self.transition(&mut inner, CircuitState::Open);
            }
            return;
        }

        // Late results from calls admitted before the breaker opened do not
        // move an open or half-open breaker.
        if inner.state != CircuitState::Closed {
            return;
        }

        inner.failure_count += 1;
        tracing::debug!(
            breaker = %self.name,
            failure_count = inner.failure_count,
            max_failures = self.max_failures,
            error = %failure,
            "Guarded call failed"
        );
        if inner.failure_count >= self.max_failures {
            self.transition(&mut inner, CircuitState::Open);
        }
    }

    fn on_abandoned_trial(&self) {
        let mut inner = self.lock();
        inner.trial_in_flight = false;
        if inner.state == CircuitState::HalfOpen {
            tracing::warn!(breaker = %self.name, "Trial call abandoned before completion");
            self.transition(&mut inner, CircuitState::Open);
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                tracing::warn!(
                    breaker = %self.name,
                    from = %from,
                    failure_count = inner.failure_count,
                    reset_timeout_ms = self.reset_timeout.as_millis() as u64,
                    "Circuit breaker opened"
                );
            }
            CircuitState::HalfOpen => {
                inner.opened_at = None;
                tracing::info!(breaker = %self.name, "Circuit breaker half-open, admitting trial call");
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.opened_at = None;
                tracing::info!(breaker = %self.name, from = %from, "Circuit breaker closed");
            }
        }
        metrics::record_breaker_state(&self.name, to);
    }
}

/// An admitted call. Dropping an unsettled trial reopens the breaker so a
/// cancelled probe cannot leave it stuck half-open.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Admission<'_> {
    fn succeed(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    fn fail(mut self, failure: &CallFailure) {
        self.settled = true;
        self.breaker.on_failure(self.trial, failure);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.on_abandoned_trial();
        }
    }
}
