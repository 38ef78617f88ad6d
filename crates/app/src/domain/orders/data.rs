//! Order Data

use rust_decimal::Decimal;

use crate::domain::{
    orders::records::{OrderItemUuid, OrderUuid},
    products::records::ProductUuid,
    users::records::{AddressUuid, UserUuid},
};

/// New Order Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub address_uuid: AddressUuid,
    pub code: String,
    pub total: Decimal,
}

/// New Order Item Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub uuid: OrderItemUuid,
    pub product_uuid: ProductUuid,
    pub quantity: u32,
    pub price: Decimal,
}
