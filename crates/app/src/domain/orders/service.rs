//! Orders service: cart conversion and stock-adjusting order edits.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        carts::{
            records::{CartItemRecord, CartItemUuid, CartUuid},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        orders::{
            code::generate_order_code,
            data::{NewOrder, NewOrderItem},
            errors::OrdersServiceError,
            events::{OrderCreated, OrderEventsPublisher, PgOrderOutbox},
            records::{OrderItemUuid, OrderRecord, OrderStatus, OrderUuid},
            repositories::{PgOrderItemsRepository, PgOrdersRepository},
        },
        products::{
            records::{ProductRecord, ProductUuid},
            repository::PgProductsRepository,
        },
        reservations::repository::PgReservationsRepository,
        users::{records::UserUuid, repository::PgUsersRepository},
    },
};

#[derive(Clone)]
pub struct PgOrdersService {
    db: Db,
    events: Arc<dyn OrderEventsPublisher>,
    orders_repository: PgOrdersRepository,
    items_repository: PgOrderItemsRepository,
    carts_repository: PgCartsRepository,
    cart_items_repository: PgCartItemsRepository,
    products_repository: PgProductsRepository,
    reservations_repository: PgReservationsRepository,
    users_repository: PgUsersRepository,
}

impl std::fmt::Debug for PgOrdersService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgOrdersService")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl PgOrdersService {
    /// Create the service, publishing events to the order outbox.
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            events: Arc::new(PgOrderOutbox::new(db.clone())),
            db,
            orders_repository: PgOrdersRepository::new(),
            items_repository: PgOrderItemsRepository::new(),
            carts_repository: PgCartsRepository::new(),
            cart_items_repository: PgCartItemsRepository::new(),
            products_repository: PgProductsRepository::new(),
            reservations_repository: PgReservationsRepository::new(),
            users_repository: PgUsersRepository::new(),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn OrderEventsPublisher>) -> Self {
        self.events = events;
        self
    }

    async fn load_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        mut order: OrderRecord,
    ) -> Result<OrderRecord, sqlx::Error> {
        order.items = self.items_repository.get_order_items(tx, order.uuid).await?;

        Ok(order)
    }

    /// Lock an order owned by `user` and require it to still be pending.
    async fn lock_pending_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let order = self.orders_repository.lock_order(tx, user, order).await?;

        if order.status != OrderStatus::Pending {
            return Err(OrdersServiceError::InvalidStatus {
                status: order.status,
            });
        }

        Ok(order)
    }

    async fn publish_created(&self, order: &OrderRecord) {
        if let Err(error) = self.events.order_created(OrderCreated::from(order)).await {
            warn!(
                order = %order.uuid,
                code = %order.code,
                error = %error,
                "failed to publish order created event"
            );
        }
    }
}

/// Units requested per product across the selected items.
fn requested_quantities(items: &[CartItemRecord]) -> FxHashMap<ProductUuid, u32> {
    let mut requested = FxHashMap::default();

    for item in items {
        *requested.entry(item.product_uuid).or_insert(0u32) += item.quantity;
    }

    requested
}

/// Check every requested quantity against the locked stock levels.
///
/// Products are visited in uuid order so the reported shortage is
/// deterministic. A product missing from `levels` has been removed and is
/// treated as having nothing available.
fn check_stock<'a>(
    requested: &FxHashMap<ProductUuid, u32>,
    levels: &'a [ProductRecord],
    selected: &[CartItemRecord],
) -> Result<FxHashMap<ProductUuid, &'a ProductRecord>, OrdersServiceError> {
    let by_uuid: FxHashMap<ProductUuid, &ProductRecord> =
        levels.iter().map(|level| (level.uuid, level)).collect();

    let mut products: Vec<(&ProductUuid, &u32)> = requested.iter().collect();
    products.sort_by_key(|(product, _)| **product);

    for (product, quantity) in products {
        match by_uuid.get(product) {
            Some(level) if level.available() >= *quantity => {}
            Some(level) => {
                return Err(OrdersServiceError::InsufficientStock {
                    product: *product,
                    name: level.name.clone(),
                    available: level.available(),
                    requested: *quantity,
                });
            }
            None => {
                let name = selected
                    .iter()
                    .find(|item| item.product_uuid == *product)
                    .map(|item| item.product_name.clone())
                    .unwrap_or_default();

                return Err(OrdersServiceError::InsufficientStock {
                    product: *product,
                    name,
                    available: 0,
                    requested: *quantity,
                });
            }
        }
    }

    Ok(by_uuid)
}

#[async_trait]
impl OrdersService for PgOrdersService {
    async fn convert_cart_to_order(&self, user: UserUuid) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .lock_active_cart(&mut tx, user)
            .await?
            .ok_or(OrdersServiceError::CartNotFound)?;

        let items = self
            .cart_items_repository
            .get_cart_items(&mut tx, cart.uuid)
            .await?;

        let (selected, unselected): (Vec<CartItemRecord>, Vec<CartItemRecord>) =
            items.into_iter().partition(|item| item.is_checked);

        if selected.is_empty() {
            return Err(OrdersServiceError::EmptyCart);
        }

        let address = self
            .users_repository
            .get_default_address(&mut tx, user)
            .await?
            .ok_or(OrdersServiceError::AddressRequired)?;

        let requested = requested_quantities(&selected);

        let mut products: Vec<ProductUuid> = requested.keys().copied().collect();
        products.sort();

        let levels = self
            .products_repository
            .lock_stock_levels(&mut tx, &products, Some(cart.uuid))
            .await?;

        let locked = check_stock(&requested, &levels, &selected)?;

        let mut total = Decimal::ZERO;
        let mut new_items = Vec::with_capacity(selected.len());

        for item in &selected {
            let price = locked
                .get(&item.product_uuid)
                .map_or(item.price, |level| level.price);

            total += price * Decimal::from(item.quantity);

            new_items.push(NewOrderItem {
                uuid: OrderItemUuid::new(),
                product_uuid: item.product_uuid,
                quantity: item.quantity,
                price,
            });
        }

        let mut order = self
            .orders_repository
            .create_order(
                &mut tx,
                NewOrder {
                    uuid: OrderUuid::new(),
                    user_uuid: user,
                    address_uuid: address.uuid,
                    code: generate_order_code(Timestamp::now()),
                    total,
                },
            )
            .await?;

        for item in new_items {
            let created = self
                .items_repository
                .create_order_item(&mut tx, order.uuid, item)
                .await?;

            order.items.push(created);
        }

        self.carts_repository
            .retire_cart(&mut tx, cart.uuid, order.uuid)
            .await?;

        if !unselected.is_empty() {
            let fresh = self
                .carts_repository
                .create_cart(&mut tx, CartUuid::new(), user)
                .await?;

            let moved: Vec<CartItemUuid> = unselected.iter().map(|item| item.uuid).collect();

            self.cart_items_repository
                .move_cart_items(&mut tx, &moved, fresh.uuid)
                .await?;
        }

        let consumed: Vec<CartItemUuid> = selected.iter().map(|item| item.uuid).collect();

        self.reservations_repository
            .release_for_cart_items(&mut tx, &consumed)
            .await?;

        for product in &products {
            let quantity = requested.get(product).copied().unwrap_or(0);

            if !self
                .products_repository
                .debit_stock(&mut tx, *product, quantity)
                .await?
            {
                let level = locked.get(product);

                return Err(OrdersServiceError::InsufficientStock {
                    product: *product,
                    name: level.map(|l| l.name.clone()).unwrap_or_default(),
                    available: level.map_or(0, |l| l.stock),
                    requested: quantity,
                });
            }
        }

        tx.commit().await?;

        info!(
            order = %order.uuid,
            code = %order.code,
            items = order.items.len(),
            total = %order.total,
            "converted cart to order"
        );

        self.publish_created(&order).await;

        Ok(order)
    }

    async fn get_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.orders_repository.get_order(&mut tx, user, order).await?;
        let order = self.load_items(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn confirm_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.lock_pending_order(&mut tx, user, order).await?;

        self.orders_repository
            .update_status(&mut tx, order.uuid, OrderStatus::Confirmed)
            .await?;

        let order = self.orders_repository.get_order(&mut tx, user, order.uuid).await?;
        let order = self.load_items(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn cancel_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.orders_repository.lock_order(&mut tx, user, order).await?;

        if order.status == OrderStatus::Cancelled {
            return Err(OrdersServiceError::InvalidStatus {
                status: order.status,
            });
        }

        let mut items = self
            .items_repository
            .get_order_items(&mut tx, order.uuid)
            .await?;

        items.sort_by_key(|item| item.product_uuid);

        for item in &items {
            self.products_repository
                .credit_stock(&mut tx, item.product_uuid, item.quantity)
                .await?;
        }

        self.orders_repository
            .update_status(&mut tx, order.uuid, OrderStatus::Cancelled)
            .await?;

        let order = self.orders_repository.get_order(&mut tx, user, order.uuid).await?;
        let order = self.load_items(&mut tx, order).await?;

        tx.commit().await?;

        info!(order = %order.uuid, code = %order.code, "cancelled order and restored stock");

        Ok(order)
    }

    async fn remove_order_item(
        &self,
        user: UserUuid,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.lock_pending_order(&mut tx, user, order).await?;

        let item = self
            .items_repository
            .lock_order_item(&mut tx, order.uuid, item)
            .await?;

        self.products_repository
            .credit_stock(&mut tx, item.product_uuid, item.quantity)
            .await?;

        self.items_repository
            .delete_order_item(&mut tx, order.uuid, item.uuid)
            .await?;

        self.orders_repository
            .recompute_total(&mut tx, order.uuid)
            .await?;

        let order = self.orders_repository.get_order(&mut tx, user, order.uuid).await?;
        let order = self.load_items(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn update_order_item_quantity(
        &self,
        user: UserUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        quantity: u32,
    ) -> Result<OrderRecord, OrdersServiceError> {
        if quantity == 0 {
            return Err(OrdersServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let order = self.lock_pending_order(&mut tx, user, order).await?;

        let current = self
            .items_repository
            .lock_order_item(&mut tx, order.uuid, item)
            .await?;

        if quantity > current.quantity {
            let delta = quantity - current.quantity;

            let level = self
                .products_repository
                .lock_stock_levels(&mut tx, &[current.product_uuid], None)
                .await?
                .into_iter()
                .next()
                .ok_or(OrdersServiceError::NotFound)?;

            if delta > level.available()
                || !self
                    .products_repository
                    .debit_stock(&mut tx, current.product_uuid, delta)
                    .await?
            {
                return Err(OrdersServiceError::InsufficientStock {
                    product: current.product_uuid,
                    name: level.name.clone(),
                    available: level.available(),
                    requested: delta,
                });
            }
        } else if quantity < current.quantity {
            self.products_repository
                .credit_stock(&mut tx, current.product_uuid, current.quantity - quantity)
                .await?;
        }

        self.items_repository
            .update_quantity(&mut tx, order.uuid, current.uuid, quantity)
            .await?;

        self.orders_repository
            .recompute_total(&mut tx, order.uuid)
            .await?;

        let order = self.orders_repository.get_order(&mut tx, user, order.uuid).await?;
        let order = self.load_items(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Convert the user's active cart into a pending order.
    ///
    /// Checked items become order items and their stock is debited; unchecked
    /// items move to a fresh cart. Either everything commits or nothing does.
    async fn convert_cart_to_order(&self, user: UserUuid) -> Result<OrderRecord, OrdersServiceError>;

    /// Retrieve an order with its items.
    async fn get_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError>;

    /// Move a pending order to confirmed. Stock is not touched.
    async fn confirm_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError>;

    /// Cancel an order, returning every item's quantity to stock.
    async fn cancel_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError>;

    /// Delete an item from a pending order, restoring its stock.
    async fn remove_order_item(
        &self,
        user: UserUuid,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<OrderRecord, OrdersServiceError>;

    /// Change an item's quantity on a pending order, debiting or restoring
    /// the difference.
    async fn update_order_item_quantity(
        &self,
        user: UserUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        quantity: u32,
    ) -> Result<OrderRecord, OrdersServiceError>;
}
