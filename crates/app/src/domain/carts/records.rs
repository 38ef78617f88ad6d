//! Cart Records

use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::{
    domain::{products::records::ProductUuid, users::records::UserUuid},
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<CartRecord>;

/// Cart Record
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub user_uuid: UserUuid,
    pub items: Vec<CartItemRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartRecord {
    /// Sum of live price times quantity across every item.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItemRecord::line_total).sum()
    }
}

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItemRecord>;

/// Cart Item Record, carrying a snapshot of its product.
#[derive(Debug, Clone)]
pub struct CartItemRecord {
    pub uuid: CartItemUuid,
    pub cart_uuid: CartUuid,
    pub product_uuid: ProductUuid,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub is_checked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartItemRecord {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: Decimal, quantity: u32) -> CartItemRecord {
        CartItemRecord {
            uuid: CartItemUuid::new(),
            cart_uuid: CartUuid::new(),
            product_uuid: ProductUuid::new(),
            product_name: "Tea".to_string(),
            price,
            quantity,
            is_checked: true,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn subtotal_sums_line_totals_exactly() {
        let cart = CartRecord {
            uuid: CartUuid::new(),
            user_uuid: UserUuid::new(),
            items: vec![
                item(Decimal::new(10, 2), 3),
                item(Decimal::new(20, 2), 1),
            ],
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        };

        assert_eq!(cart.subtotal(), Decimal::new(50, 2));
    }
}
