//! In-process counter cache.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::time::Instant;

use crate::admission::{
    cache::{CounterCache, CounterValue},
    errors::CounterCacheError,
};

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u64,
    expires_at: Instant,
}

impl Counter {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Counters held in a sharded map; suitable for a single replica or tests.
#[derive(Debug, Default)]
pub struct MemoryCounterCache {
    counters: DashMap<String, Counter>,
}

impl MemoryCounterCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored counters, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CounterCache for MemoryCounterCache {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<CounterValue, CounterCacheError> {
        let now = Instant::now();
        let fresh = Counter {
            count: 1,
            expires_at: now + ttl,
        };

        let (counter, created) = match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let counter = entry.get_mut();

                if counter.is_live(now) {
                    counter.count = counter.count.saturating_add(1);
                    (*counter, false)
                } else {
                    *counter = fresh;
                    (fresh, true)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(fresh);
                (fresh, true)
            }
        };

        Ok(CounterValue {
            count: counter.count,
            ttl: counter.expires_at.saturating_duration_since(now),
            created,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, CounterCacheError> {
        let now = Instant::now();

        Ok(self
            .counters
            .get(key)
            .filter(|counter| counter.is_live(now))
            .map(|counter| counter.count))
    }

    async fn delete(&self, key: &str) -> Result<(), CounterCacheError> {
        self.counters.remove(key);

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CounterCacheError> {
        let now = Instant::now();
        let before = self.counters.len();

        self.counters.retain(|_, counter| counter.is_live(now));

        Ok(u64::try_from(before.saturating_sub(self.counters.len())).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn increment_counts_within_window() -> TestResult {
        let cache = MemoryCounterCache::new();

        let first = cache.increment("k", MINUTE).await?;
        let second = cache.increment("k", MINUTE).await?;

        assert_eq!(first.count, 1);
        assert!(first.created, "first increment should create the counter");
        assert_eq!(second.count, 2);
        assert!(!second.created, "second increment should reuse the counter");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn increment_does_not_extend_expiry() -> TestResult {
        let cache = MemoryCounterCache::new();

        cache.increment("k", MINUTE).await?;
        tokio::time::advance(Duration::from_secs(20)).await;

        let value = cache.increment("k", MINUTE).await?;

        assert_eq!(value.ttl, Duration::from_secs(40));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn expired_counter_restarts_at_one() -> TestResult {
        let cache = MemoryCounterCache::new();

        cache.increment("k", MINUTE).await?;
        cache.increment("k", MINUTE).await?;
        tokio::time::advance(MINUTE).await;

        assert_eq!(cache.get("k").await?, None);

        let value = cache.increment("k", MINUTE).await?;

        assert_eq!(value.count, 1);
        assert!(value.created, "expired counter should be recreated");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() -> TestResult {
        let cache = MemoryCounterCache::new();

        cache.increment("a", MINUTE).await?;
        cache.increment("a", MINUTE).await?;
        cache.increment("b", MINUTE).await?;

        assert_eq!(cache.get("a").await?, Some(2));
        assert_eq!(cache.get("b").await?, Some(1));

        cache.delete("a").await?;

        assert_eq!(cache.get("a").await?, None);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_drops_only_dead_counters() -> TestResult {
        let cache = MemoryCounterCache::new();

        cache.increment("short", Duration::from_secs(1)).await?;
        cache.increment("long", MINUTE).await?;
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired().await?, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long").await?, Some(1));

        Ok(())
    }
}
