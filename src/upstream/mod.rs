//! Upstream call subsystem.
//!
//! # Data Flow
//! ```text
//! Aggregator branch
//!     → guarded.rs (GuardedCall: breaker + request spec)
//!     → resilience (admission, operation deadline)
//!     → client.rs (one GET under the request deadline)
//!     → UpstreamResponse or CallFailure
//! ```

pub mod client;
pub mod guarded;

pub use client::{HttpUpstream, UpstreamClient, UpstreamResponse};
pub use guarded::{CallOutcome, GuardedCall, RequestSpec};
