//! Carts service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::products::records::ProductUuid;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("cart or cart item not found")]
    NotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("cart item already exists")]
    AlreadyExists,

    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductUuid,
        name: String,
        available: u32,
        requested: u32,
    },

    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CartsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::ProductNotFound,
            Some(ErrorKind::CheckViolation) => Self::InvalidQuantity,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
