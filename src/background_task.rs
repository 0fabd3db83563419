use tokio::time::{interval, Duration};

use crate::limiter::rate_limiter::InMemoryRateLimitStore;

/// Periodically drops rate limit windows that have been idle for longer than `ttl`.
pub async fn start_eviction_task(store: InMemoryRateLimitStore, ttl: Duration) {
    let mut interval = interval(Duration::from_secs(60));

    loop {
        interval.tick().await;

        let evicted = store.evict_idle(ttl);
        if evicted > 0 {
            tracing::debug!("Evicted {} idle rate limit windows", evicted);
        }
    }
}
