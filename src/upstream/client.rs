//! Outbound HTTP client.
//!
//! `UpstreamClient` is the seam between guarded calls and the transport.
//! `HttpUpstream` is the reqwest-backed implementation used in production.

use std::error::Error as StdError;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::config::schema::ClientConfig;
use crate::resilience::CallFailure;

/// A completed upstream exchange. Any status counts as completed; status
/// validation belongs to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Parsed JSON body, or `Value::Null` when the body is not JSON.
    pub body: Value,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues exactly one GET per invocation.
pub trait UpstreamClient: Send + Sync {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<UpstreamResponse, CallFailure>>;
}

/// reqwest-backed upstream client shared by every branch.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(config.user_agent.clone());
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl UpstreamClient for HttpUpstream {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<UpstreamResponse, CallFailure>> {
        async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| CallFailure::upstream(describe(&e)))?;
            let status = response.status().as_u16();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| CallFailure::upstream(describe(&e)))?;
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

            tracing::debug!(url = %url, status, "Upstream responded");
            Ok(UpstreamResponse { status, body })
        }
        .boxed()
    }
}

/// Flatten an error and its sources into one line.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
