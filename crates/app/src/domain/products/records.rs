//! Product Records

use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Product Record
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: Decimal,

    /// Units physically in stock.
    pub stock: u32,

    /// Units held by active, unexpired reservations.
    pub reserved: u32,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl ProductRecord {
    /// Units that can still be reserved or sold.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.stock.saturating_sub(self.reserved)
    }
}
