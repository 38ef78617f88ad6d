//! Reservation Config

use std::time::Duration;

use clap::Args;

/// Stock reservation settings.
#[derive(Debug, Args)]
pub struct ReservationConfig {
    /// Seconds a cart line holds its stock
    #[arg(long, env = "RESERVATION_TTL_SECONDS", default_value_t = 900)]
    pub reservation_ttl_seconds: u64,

    /// Seconds between expired reservation sweeps
    #[arg(long, env = "RESERVATION_REAP_INTERVAL_SECONDS", default_value_t = 60)]
    pub reservation_reap_interval_seconds: u64,
}

impl ReservationConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.reservation_ttl_seconds)
    }

    #[must_use]
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reservation_reap_interval_seconds.max(1))
    }
}
