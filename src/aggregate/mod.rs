//! Aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! GET /aggregate
//!     → aggregator.rs (one GuardedCall per branch, all started together)
//!     → join (every branch settles, no sibling cancellation)
//!     → transport failures? → first-declared failure wins
//!     → non-2xx status?     → UpstreamError
//!     → extract source_field from each payload into output_field
//!     → result.rs (AggregationResult: Merged | Failed)
//! ```

pub mod aggregator;
pub mod result;

pub use aggregator::{Aggregator, AggregatorError, Branch};
pub use result::{AggregatedPayload, AggregationError, AggregationResult};
