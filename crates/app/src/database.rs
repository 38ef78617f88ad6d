//! Database connection management

use std::time::Duration;

use sqlx::{
    PgPool, Postgres, Transaction,
    migrate::MigrateError,
    postgres::{PgConnectOptions, PgPoolOptions},
    query,
};

/// Connection settings handed to the persistence layer at startup.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection string.
    pub url: String,

    /// Upper bound on pooled connections.
    pub max_connections: u32,

    /// How long to wait for a free pooled connection.
    pub acquire_timeout: Duration,

    /// Per-statement timeout applied to every transaction; zero disables it.
    pub statement_timeout: Duration,
}

impl DatabaseConfig {
    /// Settings with pool defaults for the given connection string.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
    statement_timeout: Duration,
}

impl Db {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_statement_timeout(mut self, statement_timeout: Duration) -> Self {
        self.statement_timeout = statement_timeout;
        self
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a transaction with the configured statement timeout applied.
    ///
    /// Dropping the returned transaction without committing rolls it back,
    /// so a cancelled request never leaves partial writes behind.
    ///
    /// # Errors
    ///
    /// Returns an error when starting the transaction or applying the timeout fails.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if !self.statement_timeout.is_zero() {
            query("SELECT set_config('statement_timeout', $1, true)")
                .bind(format!("{}ms", self.statement_timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }

        Ok(tx)
    }
}

/// Connect to `PostgreSQL` with default pool settings.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(database_url).await
}

/// Connect to `PostgreSQL` using explicit pool settings.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options: PgConnectOptions = config.url.parse()?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
}

/// Apply pending schema migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
