//! Column conversion helpers shared by the Postgres repositories.

use sqlx::{Row, postgres::PgRow};

/// Read a non-negative `INTEGER` column as a `u32` quantity.
pub(crate) fn try_get_quantity(row: &PgRow, col: &str) -> Result<u32, sqlx::Error> {
    let quantity: i32 = row.try_get(col)?;

    u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

/// Read a non-negative `BIGINT` aggregate as a `u32` quantity.
pub(crate) fn try_get_quantity_sum(row: &PgRow, col: &str) -> Result<u32, sqlx::Error> {
    let quantity: i64 = row.try_get(col)?;

    u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

/// Convert a quantity into the `INTEGER` representation used for binding.
pub(crate) fn quantity_param(col: &str, quantity: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(quantity).map_err(|e| sqlx::Error::Encode(format!("{col}: {e}").into()))
}
