//! Cart Items Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::{
    domain::{
        carts::{
            data::NewCartItem,
            records::{CartItemRecord, CartItemUuid, CartUuid},
        },
        columns::{quantity_param, try_get_quantity},
        products::records::ProductUuid,
    },
    uuids::into_uuids,
};

const GET_CART_ITEMS_SQL: &str = include_str!("../sql/get_cart_items.sql");
const GET_CART_ITEM_SQL: &str = include_str!("../sql/get_cart_item.sql");
const CREATE_CART_ITEM_SQL: &str = include_str!("../sql/create_cart_item.sql");
const UPDATE_CART_ITEM_SQL: &str = include_str!("../sql/update_cart_item.sql");
const DELETE_CART_ITEM_SQL: &str = include_str!("../sql/delete_cart_item.sql");
const MOVE_CART_ITEMS_SQL: &str = include_str!("../sql/move_cart_items.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartItemsRepository;

impl PgCartItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_cart_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Vec<CartItemRecord>, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(GET_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CartItemUuid,
    ) -> Result<CartItemRecord, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(GET_CART_ITEM_SQL)
            .bind(cart.into_uuid())
            .bind(item.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Total quantity of `product` held by the cart, ignoring `except`.
    pub(crate) async fn quantity_in_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        product: ProductUuid,
        except: Option<CartItemUuid>,
    ) -> Result<u32, sqlx::Error> {
        let items = self.get_cart_items(tx, cart).await?;

        Ok(items
            .iter()
            .filter(|item| item.product_uuid == product && Some(item.uuid) != except)
            .map(|item| item.quantity)
            .sum())
    }

    pub(crate) async fn create_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: NewCartItem,
    ) -> Result<CartItemRecord, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(CREATE_CART_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(cart.into_uuid())
            .bind(item.product_uuid.into_uuid())
            .bind(quantity_param("quantity", item.quantity)?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CartItemUuid,
        quantity: u32,
        is_checked: bool,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_CART_ITEM_SQL)
            .bind(cart.into_uuid())
            .bind(item.into_uuid())
            .bind(quantity_param("quantity", quantity)?)
            .bind(is_checked)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn delete_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CartItemUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_ITEM_SQL)
            .bind(cart.into_uuid())
            .bind(item.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Re-parent items onto another cart; their reservations follow them.
    pub(crate) async fn move_cart_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        items: &[CartItemUuid],
        to: CartUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MOVE_CART_ITEMS_SQL)
            .bind(into_uuids(items))
            .bind(to.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CartItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartItemUuid::from_uuid(row.try_get("uuid")?),
            cart_uuid: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            product_name: row.try_get("product_name")?,
            price: row.try_get("price")?,
            quantity: try_get_quantity(row, "quantity")?,
            is_checked: row.try_get("is_checked")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
