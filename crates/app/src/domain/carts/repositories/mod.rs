//! Cart and cart item repositories

mod carts;
mod items;

pub(crate) use carts::PgCartsRepository;
pub(crate) use items::PgCartItemsRepository;
