//! Storefront domain services, persistence and admission control.

pub mod admission;
pub mod auth;
pub mod context;
pub mod database;
pub mod domain;
pub mod uuids;

#[cfg(test)]
mod test;
