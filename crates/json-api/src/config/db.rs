//! Database Config

use std::time::Duration;

use clap::Args;
use storefront_app::database::DatabaseConfig;

/// Database settings.
#[derive(Debug, Args)]
pub struct DatabaseSettings {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Maximum pooled connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 20)]
    pub database_max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[arg(long, env = "DATABASE_ACQUIRE_TIMEOUT_SECONDS", default_value_t = 5)]
    pub database_acquire_timeout_seconds: u64,

    /// Per-statement timeout in milliseconds; 0 disables it
    #[arg(long, env = "DATABASE_STATEMENT_TIMEOUT_MS", default_value_t = 10_000)]
    pub database_statement_timeout_ms: u64,

    /// Apply pending migrations at startup
    #[arg(long, env = "DATABASE_RUN_MIGRATIONS", default_value_t = false)]
    pub database_run_migrations: bool,
}

impl DatabaseSettings {
    /// Settings handed to the persistence layer.
    #[must_use]
    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            max_connections: self.database_max_connections,
            acquire_timeout: Duration::from_secs(self.database_acquire_timeout_seconds),
            statement_timeout: Duration::from_millis(self.database_statement_timeout_ms),
            ..DatabaseConfig::new(self.database_url.clone())
        }
    }
}
