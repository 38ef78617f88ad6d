//! Admission control settings.

use std::time::Duration;

use clap::ValueEnum;

/// What the limiter does when the counter cache cannot answer in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Reject the request.
    #[default]
    Closed,

    /// Admit the request and log the failure.
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// When false every request is admitted without touching the cache.
    pub enabled: bool,

    /// Requests allowed per key within one window.
    pub requests_per_hour: u64,

    /// Length of a counting window.
    pub window: Duration,

    /// Upper bound on a single counter cache call.
    pub cache_timeout: Duration,

    pub failure_policy: FailurePolicy,
}

impl RateLimitConfig {
    /// Window length in whole minutes, never less than one.
    #[must_use]
    pub fn window_minutes(&self) -> u64 {
        (self.window.as_secs() / 60).max(1)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_hour: 1000,
            window: Duration::from_secs(60 * 60),
            cache_timeout: Duration::from_millis(250),
            failure_policy: FailurePolicy::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub max_concurrent_requests: usize,
    pub acquire_timeout: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 100,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}
