//! Carts Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    carts::records::{CartRecord, CartUuid},
    orders::records::OrderUuid,
    users::records::UserUuid,
};

const ENSURE_ACTIVE_CART_SQL: &str = include_str!("../sql/ensure_active_cart.sql");
const GET_ACTIVE_CART_SQL: &str = include_str!("../sql/get_active_cart.sql");
const LOCK_ACTIVE_CART_SQL: &str = include_str!("../sql/lock_active_cart.sql");
const CREATE_CART_SQL: &str = include_str!("../sql/create_cart.sql");
const RETIRE_CART_SQL: &str = include_str!("../sql/retire_cart.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_active_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<CartRecord, sqlx::Error> {
        query_as::<Postgres, CartRecord>(GET_ACTIVE_CART_SQL)
            .bind(user.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Lock the user's active cart for the rest of the transaction.
    pub(crate) async fn lock_active_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(LOCK_ACTIVE_CART_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Lock the user's active cart, creating an empty one first if needed.
    pub(crate) async fn lock_or_create_active_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<CartRecord, sqlx::Error> {
        query(ENSURE_ACTIVE_CART_SQL)
            .bind(CartUuid::new().into_uuid())
            .bind(user.into_uuid())
            .execute(&mut **tx)
            .await?;

        self.lock_active_cart(tx, user)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub(crate) async fn create_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        user: UserUuid,
    ) -> Result<CartRecord, sqlx::Error> {
        query_as::<Postgres, CartRecord>(CREATE_CART_SQL)
            .bind(cart.into_uuid())
            .bind(user.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Attach the cart to an order, taking it out of the active slot.
    pub(crate) async fn retire_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        order: OrderUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(RETIRE_CART_SQL)
            .bind(cart.into_uuid())
            .bind(order.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
