//! Products Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::{
    domain::{
        carts::records::CartUuid,
        columns::{quantity_param, try_get_quantity, try_get_quantity_sum},
        products::{
            data::NewProduct,
            records::{ProductRecord, ProductUuid},
        },
    },
    uuids::into_uuids,
};

const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const LOCK_PRODUCTS_SQL: &str = include_str!("sql/lock_products.sql");
const GET_STOCK_LEVELS_SQL: &str = include_str!("sql/get_stock_levels.sql");
const DEBIT_STOCK_SQL: &str = include_str!("sql/debit_stock.sql");
const CREDIT_STOCK_SQL: &str = include_str!("sql/credit_stock.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProductsRepository;

impl PgProductsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<ProductRecord>, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(LIST_PRODUCTS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: NewProduct,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(product.name)
            .bind(product.price)
            .bind(quantity_param("stock", product.stock)?)
            .fetch_one(&mut **tx)
            .await
    }

    /// Take row locks on the given products and read their stock levels.
    ///
    /// Reservations held by `excluding_cart` are not counted as reserved, so
    /// a cart's own holds never block its checkout. Products that do not
    /// exist (or are deleted) are absent from the result.
    pub(crate) async fn lock_stock_levels(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        products: &[ProductUuid],
        excluding_cart: Option<CartUuid>,
    ) -> Result<Vec<ProductRecord>, sqlx::Error> {
        let uuids = into_uuids(products);

        let _locked: Vec<Uuid> = query_scalar::<Postgres, Uuid>(LOCK_PRODUCTS_SQL)
            .bind(&uuids)
            .fetch_all(&mut **tx)
            .await?;

        query_as::<Postgres, ProductRecord>(GET_STOCK_LEVELS_SQL)
            .bind(&uuids)
            .bind(excluding_cart.map(CartUuid::into_uuid))
            .fetch_all(&mut **tx)
            .await
    }

    /// Remove `quantity` units from stock. Returns `false` when stock is short.
    pub(crate) async fn debit_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<bool, sqlx::Error> {
        let result = query(DEBIT_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(quantity_param("quantity", quantity)?)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Return `quantity` units to stock. Returns `false` when the product is gone.
    pub(crate) async fn credit_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<bool, sqlx::Error> {
        let result = query(CREDIT_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(quantity_param("quantity", quantity)?)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            stock: try_get_quantity(row, "stock")?,
            reserved: try_get_quantity_sum(row, "reserved")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
