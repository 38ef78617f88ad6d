//! Stock Reservations

pub mod data;
pub mod errors;
pub mod reaper;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::ReservationsServiceError;
pub use service::*;
