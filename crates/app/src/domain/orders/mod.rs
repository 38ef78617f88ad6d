//! Orders

pub mod code;
pub mod data;
pub mod errors;
pub mod events;
pub mod records;
pub(crate) mod repositories;
pub mod service;

pub use errors::OrdersServiceError;
pub use events::{OrderCreated, OrderEventsPublisher, PgOrderOutbox};
pub use service::*;
