//! Order domain events and the outbox they are written to.

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    database::Db,
    domain::orders::{records::OrderRecord, repositories::PgOutboxRepository},
};

/// Emitted once an order has been committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_uuid: Uuid,
    pub user_uuid: Uuid,
    pub code: String,
    pub total: Decimal,
    pub items: Vec<OrderCreatedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedItem {
    pub product_uuid: Uuid,
    pub quantity: u32,
    pub price: Decimal,
}

impl OrderCreated {
    pub const EVENT_TYPE: &'static str = "order.created";
}

impl From<&OrderRecord> for OrderCreated {
    fn from(order: &OrderRecord) -> Self {
        Self {
            order_uuid: order.uuid.into_uuid(),
            user_uuid: order.user_uuid.into_uuid(),
            code: order.code.clone(),
            total: order.total,
            items: order
                .items
                .iter()
                .map(|item| OrderCreatedItem {
                    product_uuid: item.product_uuid.into_uuid(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrderEventsError {
    #[error("failed to encode event")]
    Encode(#[from] serde_json::Error),

    #[error("failed to store event")]
    Sql(#[from] sqlx::Error),
}

#[automock]
#[async_trait]
pub trait OrderEventsPublisher: Send + Sync {
    /// Hand an order-created event to downstream consumers.
    async fn order_created(&self, event: OrderCreated) -> Result<(), OrderEventsError>;
}

/// Publishes events by appending them to the `order_outbox` table.
#[derive(Debug, Clone)]
pub struct PgOrderOutbox {
    db: Db,
    repository: PgOutboxRepository,
}

impl PgOrderOutbox {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgOutboxRepository::new(),
        }
    }
}

#[async_trait]
impl OrderEventsPublisher for PgOrderOutbox {
    async fn order_created(&self, event: OrderCreated) -> Result<(), OrderEventsError> {
        let payload = serde_json::to_string(&event)?;

        let mut tx = self.db.begin().await?;

        self.repository
            .append(
                &mut tx,
                event.order_uuid,
                OrderCreated::EVENT_TYPE,
                &payload,
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_created_serializes_camel_case_with_string_decimals() -> Result<(), serde_json::Error> {
        let event = OrderCreated {
            order_uuid: Uuid::nil(),
            user_uuid: Uuid::nil(),
            code: "ORD-20260301-AAAAAAAA".to_string(),
            total: Decimal::new(10_50, 2),
            items: vec![OrderCreatedItem {
                product_uuid: Uuid::nil(),
                quantity: 3,
                price: Decimal::new(3_50, 2),
            }],
        };

        let json = serde_json::to_value(&event)?;

        assert_eq!(json["code"], "ORD-20260301-AAAAAAAA");
        assert_eq!(json["total"], "10.50");
        assert_eq!(json["items"][0]["quantity"], 3);
        assert_eq!(json["items"][0]["productUuid"], Uuid::nil().to_string());

        Ok(())
    }
}
