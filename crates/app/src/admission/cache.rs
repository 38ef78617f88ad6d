//! Shared counter storage used by the rate limiter.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, warn};

use crate::admission::errors::CounterCacheError;

/// State of a counter after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterValue {
    pub count: u64,

    /// Time until the counter expires.
    pub ttl: Duration,

    /// True when this increment started a new counter.
    pub created: bool,
}

#[automock]
#[async_trait]
pub trait CounterCache: Send + Sync {
    /// Atomically add one to `key`, creating it with a lifetime of `ttl` when
    /// absent or expired. The expiry of a live counter is never extended.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<CounterValue, CounterCacheError>;

    /// Current count of a live counter.
    async fn get(&self, key: &str) -> Result<Option<u64>, CounterCacheError>;

    /// Drop a counter.
    async fn delete(&self, key: &str) -> Result<(), CounterCacheError>;

    /// Remove expired counters, returning how many were dropped.
    async fn purge_expired(&self) -> Result<u64, CounterCacheError>;
}

/// Spawn a task that purges expired counters every `period`.
///
/// Abort the returned handle to stop it.
pub fn spawn_purger(cache: Arc<dyn CounterCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match cache.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "purged expired rate limit counters"),
                Err(error) => warn!(%error, "failed to purge rate limit counters"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn purger_runs_on_every_tick_and_survives_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut cache = MockCounterCache::new();

        cache.expect_purge_expired().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CounterCacheError::Timeout(Duration::from_millis(1)))
        });

        let handle = spawn_purger(Arc::new(cache), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(65)).await;

        handle.abort();

        assert!(
            calls.load(Ordering::SeqCst) >= 3,
            "expected an immediate pass plus one per period"
        );
    }
}
