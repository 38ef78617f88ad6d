//! Users Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::users::{
    data::{NewAddress, NewUser},
    records::{AddressRecord, AddressUuid, UserRecord, UserUuid},
};

const CREATE_USER_SQL: &str = include_str!("sql/create_user.sql");
const CLEAR_DEFAULT_ADDRESS_SQL: &str = include_str!("sql/clear_default_address.sql");
const CREATE_ADDRESS_SQL: &str = include_str!("sql/create_address.sql");
const GET_DEFAULT_ADDRESS_SQL: &str = include_str!("sql/get_default_address.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgUsersRepository;

impl PgUsersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: NewUser,
    ) -> Result<UserRecord, sqlx::Error> {
        query_as::<Postgres, UserRecord>(CREATE_USER_SQL)
            .bind(user.uuid.into_uuid())
            .bind(user.username)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_address(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        address: NewAddress,
    ) -> Result<AddressRecord, sqlx::Error> {
        if address.is_default {
            query(CLEAR_DEFAULT_ADDRESS_SQL)
                .bind(user.into_uuid())
                .execute(&mut **tx)
                .await?;
        }

        query_as::<Postgres, AddressRecord>(CREATE_ADDRESS_SQL)
            .bind(address.uuid.into_uuid())
            .bind(user.into_uuid())
            .bind(address.line1)
            .bind(address.city)
            .bind(address.postcode)
            .bind(address.country)
            .bind(address.is_default)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_default_address(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<AddressRecord>, sqlx::Error> {
        query_as::<Postgres, AddressRecord>(GET_DEFAULT_ADDRESS_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for UserRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: UserUuid::from_uuid(row.try_get("uuid")?),
            username: row.try_get("username")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for AddressRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: AddressUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            line1: row.try_get("line1")?,
            city: row.try_get("city")?,
            postcode: row.try_get("postcode")?,
            country: row.try_get("country")?,
            is_default: row.try_get("is_default")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
