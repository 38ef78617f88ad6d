//! Reservation Data

use std::time::Duration;

use crate::domain::{
    carts::records::CartItemUuid, products::records::ProductUuid,
    reservations::records::ReservationUuid,
};

/// New Reservation Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub uuid: ReservationUuid,
    pub product_uuid: ProductUuid,
    pub cart_item_uuid: CartItemUuid,
    pub quantity: u32,

    /// Hold duration, measured from the start of the creating transaction.
    pub ttl: Duration,
}
