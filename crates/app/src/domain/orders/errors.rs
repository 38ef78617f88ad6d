//! Orders service errors.

use sqlx::Error;
use thiserror::Error;

use crate::domain::{orders::records::OrderStatus, products::records::ProductUuid};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("no active cart")]
    CartNotFound,

    #[error("no cart items are selected for checkout")]
    EmptyCart,

    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductUuid,
        name: String,
        available: u32,
        requested: u32,
    },

    #[error("a default address is required to place an order")]
    AddressRequired,

    #[error("order or order item not found")]
    NotFound,

    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    #[error("operation not allowed while the order is {status}")]
    InvalidStatus { status: OrderStatus },

    /// The transaction was rolled back; retrying the whole operation is safe.
    #[error("transaction failed")]
    Transaction(#[source] Error),
}

impl From<Error> for OrdersServiceError {
    fn from(error: Error) -> Self {
        match error {
            Error::RowNotFound => Self::NotFound,
            other => Self::Transaction(other),
        }
    }
}
