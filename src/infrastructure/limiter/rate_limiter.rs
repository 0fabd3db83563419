use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::RateLimitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u64,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u64, window: Duration) -> Self {
        RateLimitPolicy { max_requests, window }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        limit: u64,
        remaining: u64,
        reset_after: Duration,
    },
    Limited {
        limit: u64,
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Counter storage behind a limiter. Implementations must make the
/// increment-and-compare for one key atomic.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn hit(&self, key: &str, policy: &RateLimitPolicy) -> Result<RateLimitDecision, RateLimitError>;
}

pub type SharedRateLimitStore = Arc<dyn RateLimitStore>;

/// Fixed window: opened by the first request from a key, closed once
/// `window` has elapsed. Rejected requests are not counted.
#[derive(Debug, Clone, Copy)]
pub struct FixedWindow {
    count: u64,
    window_start: Instant,
    last_seen: Instant,
}

impl FixedWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            last_seen: now,
        }
    }

    pub fn hit(&mut self, policy: &RateLimitPolicy, now: Instant) -> RateLimitDecision {
        self.last_seen = now;

        if now.duration_since(self.window_start) >= policy.window {
            self.window_start = now;
            self.count = 0;
        }

        let reset_after = policy.window.saturating_sub(now.duration_since(self.window_start));

        if self.count < policy.max_requests {
            self.count += 1;
            RateLimitDecision::Allowed {
                limit: policy.max_requests,
                remaining: policy.max_requests - self.count,
                reset_after,
            }
        } else {
            RateLimitDecision::Limited {
                limit: policy.max_requests,
                retry_after: reset_after,
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Process-local counters keyed by client identifier.
#[derive(Clone, Default)]
pub struct InMemoryRateLimitStore {
    map: Arc<DashMap<String, FixedWindow>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit_at(&self, key: &str, policy: &RateLimitPolicy, now: Instant) -> RateLimitDecision {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let mut window = self
            .map
            .entry(key.to_string())
            .or_insert_with(|| FixedWindow::new(now));
        window.hit(policy, now)
    }

    /// Drops keys idle for longer than `ttl`. Returns how many were removed.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        self.evict_idle_at(ttl, Instant::now())
    }

    pub fn evict_idle_at(&self, ttl: Duration, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, window| now.duration_since(window.last_seen) <= ttl);
        before.saturating_sub(self.map.len())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str, policy: &RateLimitPolicy) -> Result<RateLimitDecision, RateLimitError> {
        Ok(self.hit_at(key, policy, Instant::now()))
    }
}

/// A named policy over a shared store. Keys are namespaced so several
/// limiters can share one store without interfering.
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedRateLimitStore,
    policy: RateLimitPolicy,
    namespace: &'static str,
    message: String,
}

impl RateLimiter {
    pub fn new(
        store: SharedRateLimitStore,
        policy: RateLimitPolicy,
        namespace: &'static str,
        message: impl Into<String>,
    ) -> Self {
        RateLimiter {
            store,
            policy,
            namespace,
            message: message.into(),
        }
    }

    /// Records one request for `client`. A failing store lets the request through.
    pub async fn check(&self, client: &str) -> RateLimitDecision {
        let key = format!("rl:{}:{}", self.namespace, urlencoding::encode(client));
        match self.store.hit(&key, &self.policy).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(limiter = self.namespace, "Rate limit check failed, allowing request: {}", e);
                RateLimitDecision::Allowed {
                    limit: self.policy.max_requests,
                    remaining: self.policy.max_requests,
                    reset_after: self.policy.window,
                }
            }
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
