use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use redis::AsyncCommands;

use crate::{
    errors::RateLimitError,
    infrastructure::limiter::rate_limiter::{RateLimitDecision, RateLimitPolicy, RateLimitStore},
};

/// Fixed-window counters shared across processes through Redis.
/// `INCR` is atomic server side; the first hit in a window sets the expiry.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    pool: Pool,
}

impl RedisRateLimitStore {
    pub fn new(redis_url: &str) -> Result<Self, RateLimitError> {
        let pool = RedisConfig::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;
        Ok(RedisRateLimitStore { pool })
    }

    pub async fn ping(&self) -> Result<(), RateLimitError> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(&self, key: &str, policy: &RateLimitPolicy) -> Result<RateLimitDecision, RateLimitError> {
        let mut conn = self.pool.get().await?;
        let window_secs = policy.window.as_secs().max(1);

        let count: u64 = conn.incr(key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(key, window_secs as i64).await?;
        }

        let ttl: i64 = conn.ttl(key).await?;
        let reset_after = if ttl > 0 {
            Duration::from_secs(ttl as u64)
        } else {
            // Key lost its expiry (e.g. a crash between INCR and EXPIRE); restore it.
            let _: () = conn.expire(key, window_secs as i64).await?;
            policy.window
        };

        if count <= policy.max_requests {
            Ok(RateLimitDecision::Allowed {
                limit: policy.max_requests,
                remaining: policy.max_requests - count,
                reset_after,
            })
        } else {
            // Keep the stored count bounded by the limit.
            let _: u64 = conn.decr(key, 1).await?;
            Ok(RateLimitDecision::Limited {
                limit: policy.max_requests,
                retry_after: reset_after,
            })
        }
    }
}
