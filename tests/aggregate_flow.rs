//! End-to-end aggregation tests against real local upstreams.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aggregation_gateway::config::BreakerConfig;
use aggregation_gateway::resilience::CircuitState;
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{client, gateway_config, start_mock_backend, start_programmable_backend, TestGateway};

/// Backend that counts connections and answers after `delay`.
async fn counting_backend(
    calls: Arc<AtomicU32>,
    delay: Duration,
    body: &'static str,
) -> std::net::SocketAddr {
    start_programmable_backend(move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            (200, body.to_string())
        }
    })
    .await
}

#[tokio::test]
async fn test_aggregate_merges_upstreams() {
    let posts = start_mock_backend(200, r#"{"userId":1,"id":1,"title":"T","body":"..."}"#).await;
    let users = start_mock_backend(200, r#"{"id":1,"name":"N","username":"n"}"#).await;
    let gateway = TestGateway::start(gateway_config(posts, users)).await;

    let res = client().get(gateway.url("/aggregate")).send().await.expect("Gateway unreachable");
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"post_title": "T", "author_name": "N"}));
}

#[tokio::test]
async fn test_upstream_404_returns_500() {
    let posts = start_mock_backend(404, r#"{}"#).await;
    let users = start_mock_backend(200, r#"{"name":"N"}"#).await;
    let gateway = TestGateway::start(gateway_config(posts, users)).await;

    let res = client().get(gateway.url("/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "One of the API responses failed.");
    assert!(body["message"].as_str().unwrap().contains("404"));

    // A completed call with a bad status is not a breaker failure.
    assert_eq!(gateway.breakers.get("posts").unwrap().failure_count(), 0);
}

#[tokio::test]
async fn test_timeout_records_one_failure() {
    let posts_calls = Arc::new(AtomicU32::new(0));
    let posts = counting_backend(posts_calls.clone(), Duration::from_millis(500), r#"{"title":"T"}"#).await;
    let users = start_mock_backend(200, r#"{"name":"N"}"#).await;

    let mut config = gateway_config(posts, users);
    config.upstreams[0].request_timeout_ms = 100;
    let gateway = TestGateway::start(config).await;

    let res = client().get(gateway.url("/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "API call failed or circuit breaker opened");
    assert_eq!(body["message"], "posts: request timed out after 100ms");

    let breaker = gateway.breakers.get("posts").unwrap();
    assert_eq!(breaker.failure_count(), 1);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(gateway.breakers.get("users").unwrap().failure_count(), 0);
}

#[tokio::test]
async fn test_open_breaker_skips_upstream() {
    let posts_calls = Arc::new(AtomicU32::new(0));
    let users_calls = Arc::new(AtomicU32::new(0));
    let posts = counting_backend(posts_calls.clone(), Duration::from_millis(500), r#"{"title":"T"}"#).await;
    let users = counting_backend(users_calls.clone(), Duration::ZERO, r#"{"name":"N"}"#).await;

    let mut config = gateway_config(posts, users);
    config.upstreams[0].request_timeout_ms = 100;
    config.upstreams[0].breaker = BreakerConfig {
        max_failures: 2,
        reset_timeout_ms: 60_000,
        ..BreakerConfig::default()
    };
    let gateway = TestGateway::start(config).await;
    let client = client();

    for _ in 0..2 {
        let res = client.get(gateway.url("/aggregate")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert_eq!(gateway.breakers.get("posts").unwrap().state(), CircuitState::Open);
    assert_eq!(posts_calls.load(Ordering::SeqCst), 2);

    let res = client.get(gateway.url("/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "posts: circuit breaker 'posts' is open");

    assert_eq!(posts_calls.load(Ordering::SeqCst), 2, "Open breaker must not call upstream");
    assert_eq!(users_calls.load(Ordering::SeqCst), 3, "Sibling branch still executes");
}

#[tokio::test]
async fn test_breaker_recovers_after_reset_timeout() {
    let healthy = Arc::new(AtomicBool::new(false));
    let h = healthy.clone();
    let posts = start_programmable_backend(move || {
        let h = h.clone();
        async move {
            if h.load(Ordering::SeqCst) {
                (200, r#"{"title":"T"}"#.to_string())
            } else {
                tokio::time::sleep(Duration::from_millis(500)).await;
                (200, r#"{"title":"late"}"#.to_string())
            }
        }
    })
    .await;
    let users = start_mock_backend(200, r#"{"name":"N"}"#).await;

    let mut config = gateway_config(posts, users);
    config.upstreams[0].request_timeout_ms = 100;
    config.upstreams[0].breaker = BreakerConfig {
        max_failures: 1,
        reset_timeout_ms: 300,
        ..BreakerConfig::default()
    };
    let gateway = TestGateway::start(config).await;
    let client = client();

    let res = client.get(gateway.url("/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(gateway.breakers.get("posts").unwrap().state(), CircuitState::Open);

    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let res = client.get(gateway.url("/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "Trial call should close the breaker");
    let breaker = gateway.breakers.get("posts").unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test]
async fn test_unreachable_upstream_returns_500() {
    // Bind then drop to get a local port with nothing listening.
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let posts = closed.local_addr().unwrap();
    drop(closed);
    let users = start_mock_backend(200, r#"{"name":"N"}"#).await;
    let gateway = TestGateway::start(gateway_config(posts, users)).await;

    let res = client().get(gateway.url("/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().starts_with("posts: upstream error"));
    assert_eq!(gateway.breakers.get("posts").unwrap().failure_count(), 1);

    // Gateway stays available.
    let res = client().get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
