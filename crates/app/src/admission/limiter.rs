//! Fixed-window request counting per principal, client address and path.

use std::{fmt, sync::Arc, time::Duration};

use jiff::Timestamp;
use tokio::time::timeout;
use tracing::warn;

use crate::admission::{
    cache::CounterCache,
    config::{FailurePolicy, RateLimitConfig},
    errors::{CounterCacheError, RateLimitError},
    key::{rate_limit_key, until_next_window},
};

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,

    /// Requests counted in the current window, this one included.
    pub current_count: u64,

    pub limit: u64,

    /// Set when the request is rejected: time until the window resets.
    pub retry_after: Option<Duration>,

    /// True when this request opened a new window.
    pub new_window: bool,

    /// True when the cache failed and the request was admitted anyway.
    pub degraded: bool,
}

impl RateLimitDecision {
    fn admitted(limit: u64) -> Self {
        Self {
            allowed: true,
            current_count: 0,
            limit,
            retry_after: None,
            new_window: false,
            degraded: false,
        }
    }

    /// Requests left in the current window.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.current_count)
    }

    /// True only for the request that first went over the limit, so each
    /// key raises at most one alert per window.
    #[must_use]
    pub fn first_rejection(&self) -> bool {
        !self.allowed && self.current_count == self.limit.saturating_add(1)
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    cache: Arc<dyn CounterCache>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig, cache: Arc<dyn CounterCache>) -> Self {
        Self { config, cache }
    }

    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counter key for a request observed at `now`.
    #[must_use]
    pub fn key_for(
        &self,
        principal: Option<&str>,
        client_ip: &str,
        path: &str,
        now: Timestamp,
    ) -> String {
        rate_limit_key(
            principal,
            client_ip,
            path,
            now,
            self.config.window_minutes(),
        )
    }

    /// Count one request against `key`, observed at `now`, and decide whether
    /// it may proceed.
    ///
    /// A new counter expires when the window containing `now` closes, which
    /// is also when [`key_for`](Self::key_for) moves to the next key.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Cache`] when the counter cache fails or
    /// times out and the failure policy is [`FailurePolicy::Closed`].
    pub async fn check(
        &self,
        key: &str,
        now: Timestamp,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let limit = self.config.requests_per_hour;

        if !self.config.enabled {
            return Ok(RateLimitDecision::admitted(limit));
        }

        let window_left = until_next_window(now, self.config.window_minutes());

        let value = match timeout(
            self.config.cache_timeout,
            self.cache.increment(key, window_left),
        )
        .await
        {
            Ok(Ok(value)) => value,
            Ok(Err(error)) => return self.on_cache_failure(key, error),
            Err(_elapsed) => {
                return self.on_cache_failure(
                    key,
                    CounterCacheError::Timeout(self.config.cache_timeout),
                );
            }
        };

        let allowed = value.count <= limit;

        Ok(RateLimitDecision {
            allowed,
            current_count: value.count,
            limit,
            retry_after: (!allowed).then(|| retry_after(value.ttl.min(window_left))),
            new_window: value.created,
            degraded: false,
        })
    }

    /// Whether `key` has already spent its quota, without counting anything.
    ///
    /// Lets callers skip expensive work for requests [`check`](Self::check)
    /// is about to reject. Cache failures answer `false` and leave the
    /// decision to `check`.
    pub async fn is_exhausted(&self, key: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        match timeout(self.config.cache_timeout, self.cache.get(key)).await {
            Ok(Ok(Some(count))) => count >= self.config.requests_per_hour,
            Ok(Ok(None) | Err(_)) | Err(_) => false,
        }
    }

    fn on_cache_failure(
        &self,
        key: &str,
        error: CounterCacheError,
    ) -> Result<RateLimitDecision, RateLimitError> {
        match self.config.failure_policy {
            FailurePolicy::Closed => Err(error.into()),
            FailurePolicy::Open => {
                warn!(key, error = %error, "rate limit cache failed; admitting request");

                Ok(RateLimitDecision {
                    degraded: true,
                    ..RateLimitDecision::admitted(self.config.requests_per_hour)
                })
            }
        }
    }
}

/// Whole seconds until reset, never less than one.
fn retry_after(ttl: Duration) -> Duration {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);

    Duration::from_secs(secs.max(1))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use testresult::TestResult;

    use crate::admission::{
        cache::{CounterValue, MockCounterCache},
        memory::MemoryCounterCache,
    };

    use super::*;

    /// A window boundary for every window length.
    const START: Timestamp = Timestamp::UNIX_EPOCH;

    fn config(limit: u64) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_hour: limit,
            ..RateLimitConfig::default()
        }
    }

    fn memory_limiter(limit: u64) -> RateLimiter {
        RateLimiter::new(config(limit), Arc::new(MemoryCounterCache::new()))
    }

    #[derive(Debug)]
    struct SlowCache;

    #[async_trait]
    impl CounterCache for SlowCache {
        async fn increment(
            &self,
            _key: &str,
            ttl: Duration,
        ) -> Result<CounterValue, CounterCacheError> {
            tokio::time::sleep(Duration::from_secs(10)).await;

            Ok(CounterValue {
                count: 1,
                ttl,
                created: true,
            })
        }

        async fn get(&self, _key: &str) -> Result<Option<u64>, CounterCacheError> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> Result<(), CounterCacheError> {
            Ok(())
        }

        async fn purge_expired(&self) -> Result<u64, CounterCacheError> {
            Ok(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn requests_over_limit_are_rejected() -> TestResult {
        let limiter = memory_limiter(3);

        for expected in 1..=3 {
            let decision = limiter.check("k", START).await?;

            assert!(decision.allowed, "request {expected} should be allowed");
            assert_eq!(decision.current_count, expected);
            assert!(decision.retry_after.is_none(), "allowed has no retry");
        }

        let rejected = limiter.check("k", START).await?;

        assert!(!rejected.allowed, "fourth request should be rejected");
        assert_eq!(rejected.current_count, 4);
        assert_eq!(rejected.remaining(), 0);
        assert_eq!(rejected.retry_after, Some(Duration::from_secs(60 * 60)));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn window_reset_admits_again() -> TestResult {
        let limiter = memory_limiter(1);

        assert!(limiter.check("k", START).await?.allowed, "first request allowed");
        assert!(!limiter.check("k", START).await?.allowed, "second request rejected");

        tokio::time::advance(Duration::from_secs(60 * 60)).await;

        let decision = limiter.check("k", START).await?;

        assert!(decision.allowed, "new window should admit");
        assert!(decision.new_window, "counter should restart");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_counts_down_with_window() -> TestResult {
        let limiter = memory_limiter(1);

        limiter.check("k", START).await?;
        tokio::time::advance(Duration::from_millis(90_500)).await;

        let decision = limiter.check("k", START).await?;

        assert_eq!(decision.retry_after, Some(Duration::from_secs(3600 - 90)));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_counted_separately() -> TestResult {
        let limiter = memory_limiter(1);

        assert!(limiter.check("a", START).await?.allowed, "key a allowed");
        assert!(limiter.check("b", START).await?.allowed, "key b allowed");
        assert!(!limiter.check("a", START).await?.allowed, "key a rejected");

        Ok(())
    }

    #[tokio::test]
    async fn disabled_limiter_never_touches_cache() -> TestResult {
        let mut cache = MockCounterCache::new();
        cache.expect_increment().never();

        let limiter = RateLimiter::new(
            RateLimitConfig {
                enabled: false,
                ..config(1)
            },
            Arc::new(cache),
        );

        for _ in 0..5 {
            assert!(limiter.check("k", START).await?.allowed, "disabled should admit");
        }

        Ok(())
    }

    #[tokio::test]
    async fn cache_failure_fails_closed_by_default() {
        let mut cache = MockCounterCache::new();
        cache
            .expect_increment()
            .returning(|_, _| Err(CounterCacheError::Unavailable(sqlx::Error::PoolTimedOut)));

        let limiter = RateLimiter::new(config(10), Arc::new(cache));

        let result = limiter.check("k", START).await;

        assert!(
            matches!(
                result,
                Err(RateLimitError::Cache(CounterCacheError::Unavailable(_)))
            ),
            "expected Cache(Unavailable), got {result:?}"
        );
    }

    #[tokio::test]
    async fn cache_failure_fails_open_when_configured() -> TestResult {
        let mut cache = MockCounterCache::new();
        cache
            .expect_increment()
            .returning(|_, _| Err(CounterCacheError::Unavailable(sqlx::Error::PoolTimedOut)));

        let limiter = RateLimiter::new(
            RateLimitConfig {
                failure_policy: FailurePolicy::Open,
                ..config(10)
            },
            Arc::new(cache),
        );

        let decision = limiter.check("k", START).await?;

        assert!(decision.allowed, "fail-open should admit");
        assert!(decision.degraded, "decision should be marked degraded");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cache_times_out() {
        let limiter = RateLimiter::new(config(10), Arc::new(SlowCache));

        let result = limiter.check("k", START).await;

        assert!(
            matches!(
                result,
                Err(RateLimitError::Cache(CounterCacheError::Timeout(_)))
            ),
            "expected Cache(Timeout), got {result:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_stops_at_the_window_boundary() -> TestResult {
        let limiter = memory_limiter(1);
        let late = START + jiff::SignedDuration::from_mins(55);

        limiter.check("k", late).await?;
        let decision = limiter.check("k", late).await?;

        assert!(!decision.allowed, "second request should be rejected");
        assert_eq!(decision.retry_after, Some(Duration::from_secs(5 * 60)));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_never_outlives_a_stale_counter_window() -> TestResult {
        let mut cache = MockCounterCache::new();
        cache.expect_increment().returning(|_, _| {
            Ok(CounterValue {
                count: 2,
                ttl: Duration::from_secs(55 * 60),
                created: false,
            })
        });

        let limiter = RateLimiter::new(config(1), Arc::new(cache));
        let late = START + jiff::SignedDuration::from_mins(55);

        let decision = limiter.check("k", late).await?;

        assert_eq!(decision.retry_after, Some(Duration::from_secs(5 * 60)));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_first_rejection_is_flagged() -> TestResult {
        let limiter = memory_limiter(2);

        let mut flagged = 0;

        for _ in 0..6 {
            if limiter.check("k", START).await?.first_rejection() {
                flagged += 1;
            }
        }

        assert_eq!(flagged, 1);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_once_quota_is_spent() -> TestResult {
        let limiter = memory_limiter(2);

        assert!(!limiter.is_exhausted("k").await, "unknown key has quota");

        limiter.check("k", START).await?;
        assert!(!limiter.is_exhausted("k").await, "one request left");

        limiter.check("k", START).await?;
        assert!(limiter.is_exhausted("k").await, "next request would be rejected");

        Ok(())
    }

    #[tokio::test]
    async fn exhaustion_check_ignores_cache_failures() {
        let mut cache = MockCounterCache::new();
        cache
            .expect_get()
            .returning(|_| Err(CounterCacheError::Unavailable(sqlx::Error::PoolTimedOut)));

        let limiter = RateLimiter::new(config(1), Arc::new(cache));

        assert!(!limiter.is_exhausted("k").await, "failure defers to check");
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(retry_after(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(retry_after(Duration::from_millis(1500)), Duration::from_secs(2));
        assert_eq!(retry_after(Duration::from_secs(30)), Duration::from_secs(30));
    }
}
