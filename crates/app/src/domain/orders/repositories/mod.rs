//! Order Repositories

mod items;
mod orders;
mod outbox;

pub(crate) use items::PgOrderItemsRepository;
pub(crate) use orders::PgOrdersRepository;
pub(crate) use outbox::PgOutboxRepository;
