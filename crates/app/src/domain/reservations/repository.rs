//! Reservations Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::{
    domain::{
        carts::records::CartItemUuid,
        columns::{quantity_param, try_get_quantity},
        products::records::ProductUuid,
        reservations::{
            data::NewReservation,
            records::{ReservationRecord, ReservationUuid},
        },
    },
    uuids::into_uuids,
};

const CREATE_RESERVATION_SQL: &str = include_str!("sql/create_reservation.sql");
const RELEASE_FOR_CART_ITEMS_SQL: &str = include_str!("sql/release_for_cart_items.sql");
const REAP_EXPIRED_SQL: &str = include_str!("sql/reap_expired.sql");
const LIST_ACTIVE_SQL: &str = include_str!("sql/list_active.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgReservationsRepository;

impl PgReservationsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_reservation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reservation: NewReservation,
    ) -> Result<ReservationRecord, sqlx::Error> {
        query_as::<Postgres, ReservationRecord>(CREATE_RESERVATION_SQL)
            .bind(reservation.uuid.into_uuid())
            .bind(reservation.product_uuid.into_uuid())
            .bind(reservation.cart_item_uuid.into_uuid())
            .bind(quantity_param("quantity", reservation.quantity)?)
            .bind(reservation.ttl.as_secs_f64())
            .fetch_one(&mut **tx)
            .await
    }

    /// Deactivate the active reservations held by the given cart items.
    pub(crate) async fn release_for_cart_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        items: &[CartItemUuid],
    ) -> Result<u64, sqlx::Error> {
        let result = query(RELEASE_FOR_CART_ITEMS_SQL)
            .bind(into_uuids(items))
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn reap_expired(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: Timestamp,
    ) -> Result<Vec<ReservationRecord>, sqlx::Error> {
        query_as::<Postgres, ReservationRecord>(REAP_EXPIRED_SQL)
            .bind(SqlxTimestamp::from(now))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Vec<ReservationRecord>, sqlx::Error> {
        query_as::<Postgres, ReservationRecord>(LIST_ACTIVE_SQL)
            .bind(product.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for ReservationRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ReservationUuid::from_uuid(row.try_get("uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            cart_item_uuid: CartItemUuid::from_uuid(row.try_get("cart_item_uuid")?),
            quantity: try_get_quantity(row, "quantity")?,
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            is_active: row.try_get("is_active")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            released_at: row
                .try_get::<Option<SqlxTimestamp>, _>("released_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
