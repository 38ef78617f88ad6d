//! Order Outbox Repository

use sqlx::{Postgres, Transaction, query};
use uuid::Uuid;

const APPEND_OUTBOX_EVENT_SQL: &str = include_str!("../sql/append_outbox_event.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOutboxRepository;

impl PgOutboxRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn append(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: Uuid,
        event_type: &str,
        payload: &str,
    ) -> Result<(), sqlx::Error> {
        query(APPEND_OUTBOX_EVENT_SQL)
            .bind(Uuid::now_v7())
            .bind(order)
            .bind(event_type)
            .bind(payload)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}
