//! Timeout enforcement.
//!
//! Every outbound call runs under two deadlines: the guarded call's own
//! request timeout and the breaker's operation timeout. Both use Tokio's
//! timer; an elapsed deadline becomes `CallFailure::Timeout` tagged with the
//! clock that fired. The inner future is dropped on expiry.

use std::future::Future;
use std::time::Duration;

use crate::resilience::failure::{CallFailure, TimeoutScope};

/// Run `fut` under `limit`, mapping expiry to a scoped timeout failure.
pub async fn with_deadline<F, T>(
    scope: TimeoutScope,
    limit: Duration,
    fut: F,
) -> Result<T, CallFailure>
where
    F: Future<Output = Result<T, CallFailure>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CallFailure::Timeout {
            scope,
            after: limit,
        }),
    }
}
