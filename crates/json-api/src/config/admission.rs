//! Admission Control Config

use std::time::Duration;

use clap::{Args, ValueEnum};
use storefront_app::admission::{FailurePolicy, RateLimitConfig, ThrottleConfig};

/// Where rate-limit counters are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CounterBackend {
    /// Shared across replicas through the database.
    Postgres,

    /// Local to this process.
    Memory,
}

/// Rate limiting settings.
#[derive(Debug, Args)]
pub struct RateLimitSettings {
    /// Enable per-client rate limiting
    #[arg(
        long,
        env = "RATE_LIMIT_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub rate_limit_enabled: bool,

    /// Requests allowed per client within one window
    #[arg(long, env = "RATE_LIMIT_REQUESTS_PER_HOUR", default_value_t = 1000)]
    pub rate_limit_requests_per_hour: u64,

    /// Counting window length in minutes
    #[arg(long, env = "RATE_LIMIT_WINDOW_SIZE_MINUTES", default_value_t = 60)]
    pub rate_limit_window_size_minutes: u64,

    /// Upper bound on a counter cache call in milliseconds
    #[arg(long, env = "RATE_LIMIT_CACHE_TIMEOUT_MS", default_value_t = 250)]
    pub rate_limit_cache_timeout_ms: u64,

    /// Behaviour when the counter cache fails (closed, open)
    #[arg(
        long,
        env = "RATE_LIMIT_FAILURE_POLICY",
        value_enum,
        default_value_t = FailurePolicy::Closed
    )]
    pub rate_limit_failure_policy: FailurePolicy,

    /// Counter storage (postgres, memory)
    #[arg(
        long = "rate-limit-backend",
        env = "RATE_LIMIT_BACKEND",
        value_enum,
        default_value_t = CounterBackend::Postgres
    )]
    pub backend: CounterBackend,

    /// Reverse proxies in front of the server that append to
    /// `x-forwarded-for`; zero keys clients by peer address only
    #[arg(long, env = "TRUSTED_PROXY_HOPS", default_value_t = 0)]
    pub trusted_proxy_hops: usize,
}

impl RateLimitSettings {
    #[must_use]
    pub fn to_rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            enabled: self.rate_limit_enabled,
            requests_per_hour: self.rate_limit_requests_per_hour,
            window: Duration::from_secs(self.rate_limit_window_size_minutes.max(1) * 60),
            cache_timeout: Duration::from_millis(self.rate_limit_cache_timeout_ms),
            failure_policy: self.rate_limit_failure_policy,
        }
    }
}

/// Concurrency throttle settings.
#[derive(Debug, Args)]
pub struct ThrottleSettings {
    /// Requests processed at once before new ones wait
    #[arg(long, env = "MAX_CONCURRENT_REQUESTS", default_value_t = 100)]
    pub max_concurrent_requests: usize,

    /// Milliseconds a request waits for a slot before being rejected
    #[arg(long, env = "THROTTLE_ACQUIRE_TIMEOUT_MS", default_value_t = 5_000)]
    pub throttle_acquire_timeout_ms: u64,
}

impl ThrottleSettings {
    #[must_use]
    pub fn to_throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            acquire_timeout: Duration::from_millis(self.throttle_acquire_timeout_ms),
        }
    }
}

/// Alert delivery settings.
#[derive(Debug, Args)]
pub struct AlertConfig {
    /// Webhook that receives rate-limit alerts; logged only when unset
    #[arg(long, env = "ALERT_WEBHOOK_URL")]
    pub alert_webhook_url: Option<String>,

    /// Milliseconds a webhook delivery may take before it is abandoned
    #[arg(long, env = "ALERT_WEBHOOK_TIMEOUT_MS", default_value_t = 2_000)]
    pub alert_webhook_timeout_ms: u64,
}

impl AlertConfig {
    #[must_use]
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.alert_webhook_timeout_ms.max(1))
    }
}
