//! Storefront Domain Concerns

pub mod carts;
pub(crate) mod columns;
pub mod orders;
pub mod products;
pub mod reservations;
pub mod users;
