//! Products Data

use rust_decimal::Decimal;

use crate::domain::products::records::ProductUuid;

/// New Product Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
}
