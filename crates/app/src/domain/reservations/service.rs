//! Reservations service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        products::records::ProductUuid,
        reservations::{
            errors::ReservationsServiceError, records::ReservationRecord,
            repository::PgReservationsRepository,
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgReservationsService {
    db: Db,
    repository: PgReservationsRepository,
}

impl PgReservationsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgReservationsRepository::new(),
        }
    }
}

#[async_trait]
impl ReservationsService for PgReservationsService {
    async fn reap_expired(
        &self,
        now: Timestamp,
    ) -> Result<Vec<ReservationRecord>, ReservationsServiceError> {
        let mut tx = self.db.begin().await?;

        let released = self.repository.reap_expired(&mut tx, now).await?;

        tx.commit().await?;

        Ok(released)
    }

    async fn list_active(
        &self,
        product: ProductUuid,
    ) -> Result<Vec<ReservationRecord>, ReservationsServiceError> {
        let mut tx = self.db.begin().await?;

        let reservations = self.repository.list_active(&mut tx, product).await?;

        tx.commit().await?;

        Ok(reservations)
    }
}

#[automock]
#[async_trait]
pub trait ReservationsService: Send + Sync {
    /// Deactivate every active reservation that expired at or before `now`,
    /// returning the reservations released.
    async fn reap_expired(
        &self,
        now: Timestamp,
    ) -> Result<Vec<ReservationRecord>, ReservationsServiceError>;

    /// Active, unexpired reservations against a product.
    async fn list_active(
        &self,
        product: ProductUuid,
    ) -> Result<Vec<ReservationRecord>, ReservationsServiceError>;
}
