//! Counter cache shared by every replica through `PostgreSQL`.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as, query_scalar};

use crate::{
    admission::{
        cache::{CounterCache, CounterValue},
        errors::CounterCacheError,
    },
    database::Db,
};

const INCREMENT_COUNTER_SQL: &str = include_str!("sql/increment_counter.sql");
const GET_COUNTER_SQL: &str = include_str!("sql/get_counter.sql");
const DELETE_COUNTER_SQL: &str = include_str!("sql/delete_counter.sql");
const PURGE_EXPIRED_COUNTERS_SQL: &str = include_str!("sql/purge_expired_counters.sql");

/// Counters in the unlogged `rate_limit_counters` table.
///
/// Each increment is one upsert, so concurrent callers never lose a count.
#[derive(Debug, Clone)]
pub struct PgCounterCache {
    db: Db,
}

impl PgCounterCache {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

struct CounterRow(CounterValue);

impl<'r> FromRow<'r, PgRow> for CounterRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let count: i64 = row.try_get("count")?;
        let ttl_seconds: f64 = row.try_get("ttl_seconds")?;

        Ok(Self(CounterValue {
            count: count.unsigned_abs(),
            ttl: Duration::try_from_secs_f64(ttl_seconds).unwrap_or(Duration::ZERO),
            created: row.try_get("created")?,
        }))
    }
}

#[async_trait]
impl CounterCache for PgCounterCache {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<CounterValue, CounterCacheError> {
        let CounterRow(value) = query_as::<Postgres, CounterRow>(INCREMENT_COUNTER_SQL)
            .bind(key)
            .bind(ttl.as_secs_f64())
            .fetch_one(self.db.pool())
            .await?;

        Ok(value)
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, CounterCacheError> {
        let count = query_scalar::<Postgres, i64>(GET_COUNTER_SQL)
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(count.map(i64::unsigned_abs))
    }

    async fn delete(&self, key: &str) -> Result<(), CounterCacheError> {
        query(DELETE_COUNTER_SQL)
            .bind(key)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CounterCacheError> {
        let result = query(PURGE_EXPIRED_COUNTERS_SQL)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
