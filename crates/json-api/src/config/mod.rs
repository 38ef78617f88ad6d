//! Server configuration module

use clap::Parser;

use crate::config::{
    admission::{AlertConfig, RateLimitSettings, ThrottleSettings},
    db::DatabaseSettings,
    observability::{LoggingConfig, ObservabilityConfig},
    reservations::ReservationConfig,
    server::ServerRuntimeConfig,
};

pub(crate) mod admission;
pub(crate) mod db;
pub(crate) mod observability;
pub(crate) mod reservations;
pub(crate) mod server;

pub(crate) use observability::LogFormat;

/// Storefront JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "storefront-json", about = "Storefront JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Trace export settings.
    #[command(flatten)]
    pub observability: ObservabilityConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseSettings,

    /// Per-client request quotas.
    #[command(flatten)]
    pub rate_limit: RateLimitSettings,

    /// In-flight request bound.
    #[command(flatten)]
    pub throttle: ThrottleSettings,

    /// Rate-limit alert delivery.
    #[command(flatten)]
    pub alerts: AlertConfig,

    /// Cart stock hold settings.
    #[command(flatten)]
    pub reservations: ReservationConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        dotenvy::dotenv().ok();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use storefront_app::admission::FailurePolicy;
    use testresult::TestResult;

    use crate::config::admission::CounterBackend;

    use super::*;

    #[test]
    fn defaults_match_documented_values() -> TestResult {
        let config = ServerConfig::try_parse_from([
            "storefront-json",
            "--database-url",
            "postgres://localhost/storefront",
        ])?;

        let rate_limit = config.rate_limit.to_rate_limit_config();

        assert!(rate_limit.enabled, "rate limiting should default on");
        assert_eq!(rate_limit.requests_per_hour, 1000);
        assert_eq!(rate_limit.window, Duration::from_secs(60 * 60));
        assert_eq!(rate_limit.failure_policy, FailurePolicy::Closed);
        assert_eq!(config.rate_limit.backend, CounterBackend::Postgres);

        let throttle = config.throttle.to_throttle_config();

        assert_eq!(throttle.max_concurrent_requests, 100);
        assert_eq!(throttle.acquire_timeout, Duration::from_secs(5));

        assert_eq!(config.reservations.ttl(), Duration::from_secs(900));
        assert_eq!(config.reservations.reap_interval(), Duration::from_secs(60));
        assert!(config.alerts.alert_webhook_url.is_none(), "no webhook by default");

        Ok(())
    }

    #[test]
    fn server_and_logging_defaults() -> TestResult {
        let config = ServerConfig::try_parse_from([
            "storefront-json",
            "--database-url",
            "postgres://localhost/storefront",
        ])?;

        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
        assert_eq!(config.logging.slow_request_threshold_ms, 1_000);
        assert!(
            !config.observability.propagates_parent(),
            "parent propagation needs otel"
        );

        Ok(())
    }

    #[test]
    fn parent_propagation_requires_export() -> TestResult {
        let config = ServerConfig::try_parse_from([
            "storefront-json",
            "--database-url",
            "postgres://localhost/storefront",
            "--otel-parent-propagation-enabled",
        ])?;

        assert!(
            !config.observability.propagates_parent(),
            "propagation alone should not take effect"
        );

        let config = ServerConfig::try_parse_from([
            "storefront-json",
            "--database-url",
            "postgres://localhost/storefront",
            "--otel-parent-propagation-enabled",
            "--otel-enabled",
        ])?;

        assert!(
            config.observability.propagates_parent(),
            "propagation should apply with export on"
        );

        Ok(())
    }

    #[test]
    fn rate_limit_flags_override_defaults() -> TestResult {
        let config = ServerConfig::try_parse_from([
            "storefront-json",
            "--database-url",
            "postgres://localhost/storefront",
            "--rate-limit-requests-per-hour",
            "5",
            "--rate-limit-window-size-minutes",
            "10",
            "--rate-limit-failure-policy",
            "open",
            "--rate-limit-backend",
            "memory",
        ])?;

        let rate_limit = config.rate_limit.to_rate_limit_config();

        assert_eq!(rate_limit.requests_per_hour, 5);
        assert_eq!(rate_limit.window, Duration::from_secs(600));
        assert_eq!(rate_limit.failure_policy, FailurePolicy::Open);
        assert_eq!(config.rate_limit.backend, CounterBackend::Memory);

        Ok(())
    }
}
