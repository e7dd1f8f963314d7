//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Guarded call to upstream:
//!     → circuit_breaker.rs (admission: closed / open / half-open trial)
//!     → timeouts.rs (operation deadline around the request deadline)
//!     → circuit_breaker.rs (record outcome, open circuit at threshold)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has two deadlines
//! - No retries: one attempt per inbound request
//! - One breaker per upstream, held in registry.rs for the process lifetime
//! - Failures are values (`CallFailure`), never panics

pub mod circuit_breaker;
pub mod failure;
pub mod registry;
pub mod timeouts;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use failure::{CallFailure, TimeoutScope};
pub use registry::BreakerRegistry;
