//! Aggregation outcome → HTTP response.
//!
//! Exactly two shapes leave the gateway: 200 with the merged fields, or 500
//! with `{"error", "message"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationResult;

/// Body of every failed aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Headline (e.g. "API call failed or circuit breaker opened").
    pub error: String,
    /// Triggering upstream and cause.
    pub message: String,
}

impl IntoResponse for AggregationResult {
    fn into_response(self) -> Response {
        match self {
            AggregationResult::Merged(payload) => (StatusCode::OK, Json(payload)).into_response(),
            AggregationResult::Failed(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: err.message,
                    message: err.cause_summary,
                }),
            )
                .into_response(),
        }
    }
}
