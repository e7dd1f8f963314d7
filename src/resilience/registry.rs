//! Process-wide breaker registry.
//!
//! Built once at startup with one breaker per configured upstream and shared
//! via `Arc`. The map itself is never mutated afterwards; only each breaker's
//! internal state changes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::UpstreamConfig;
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitBreaker};

#[derive(Debug, Default)]
pub struct BreakerRegistry {
    /// Declaration order, for stable admin output.
    ordered: Vec<Arc<CircuitBreaker>>,
    by_name: HashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// One breaker per upstream, named after it. Later duplicates are ignored;
    /// validation rejects them before this point.
    pub fn from_upstreams(upstreams: &[UpstreamConfig]) -> Self {
        let mut registry = Self::default();
        for upstream in upstreams {
            if registry.by_name.contains_key(&upstream.name) {
                tracing::warn!(upstream = %upstream.name, "Duplicate upstream name, keeping first breaker");
                continue;
            }
            let breaker = Arc::new(CircuitBreaker::new(upstream.name.clone(), &upstream.breaker));
            registry.by_name.insert(upstream.name.clone(), breaker.clone());
            registry.ordered.push(breaker);
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.by_name.get(name).cloned()
    }

    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        self.ordered.iter().map(|b| b.snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::resilience::circuit_breaker::CircuitState;
    use crate::resilience::failure::CallFailure;

    #[tokio::test]
    async fn test_breakers_are_independent() {
        let registry = BreakerRegistry::from_upstreams(&GatewayConfig::default().upstreams);
        assert_eq!(registry.len(), 2);

        let posts = registry.get("posts").unwrap();
        let users = registry.get("users").unwrap();
        for _ in 0..3 {
            let _: Result<(), _> = posts
                .execute(|| async { Err(CallFailure::upstream("boom")) })
                .await;
        }

        assert_eq!(posts.state(), CircuitState::Open);
        assert_eq!(users.state(), CircuitState::Closed);
        assert_eq!(users.failure_count(), 0);
        assert!(Arc::ptr_eq(&posts, &registry.get("posts").unwrap()));
    }

    #[test]
    fn test_snapshots_keep_declaration_order() {
        let registry = BreakerRegistry::from_upstreams(&GatewayConfig::default().upstreams);
        let names: Vec<_> = registry.snapshots().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["posts", "users"]);
        assert!(registry.get("orders").is_none());
    }
}
