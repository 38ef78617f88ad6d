//! Reservation Records

use jiff::Timestamp;

use crate::{
    domain::{carts::records::CartItemUuid, products::records::ProductUuid},
    uuids::TypedUuid,
};

/// Reservation UUID
pub type ReservationUuid = TypedUuid<ReservationRecord>;

/// A time-bounded hold on product stock for a cart item.
#[derive(Debug, Clone)]
pub struct ReservationRecord {
    pub uuid: ReservationUuid,
    pub product_uuid: ProductUuid,
    pub cart_item_uuid: CartItemUuid,
    pub quantity: u32,
    pub expires_at: Timestamp,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub released_at: Option<Timestamp>,
}
