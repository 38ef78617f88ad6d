//! Cart Data

use crate::domain::{carts::records::CartItemUuid, products::records::ProductUuid};

/// New Cart Item Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    pub uuid: CartItemUuid,
    pub product_uuid: ProductUuid,
    pub quantity: u32,
}

/// Cart Item Update Data
///
/// Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartItemUpdate {
    pub quantity: Option<u32>,
    pub is_checked: Option<bool>,
}
