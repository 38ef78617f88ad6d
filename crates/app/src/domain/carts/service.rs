//! Carts service.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use sqlx::{Postgres, Transaction};

use crate::{
    database::Db,
    domain::{
        carts::{
            data::{CartItemUpdate, NewCartItem},
            errors::CartsServiceError,
            records::{CartItemRecord, CartItemUuid, CartRecord, CartUuid},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        products::{records::ProductUuid, repository::PgProductsRepository},
        reservations::{
            data::NewReservation, records::ReservationUuid, repository::PgReservationsRepository,
        },
        users::records::UserUuid,
    },
};

/// How long a cart item holds its stock when no TTL is configured.
pub const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    reservation_ttl: Duration,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
    products_repository: PgProductsRepository,
    reservations_repository: PgReservationsRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            reservation_ttl: DEFAULT_RESERVATION_TTL,
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
            products_repository: PgProductsRepository::new(),
            reservations_repository: PgReservationsRepository::new(),
        }
    }

    #[must_use]
    pub fn with_reservation_ttl(mut self, reservation_ttl: Duration) -> Self {
        self.reservation_ttl = reservation_ttl;
        self
    }

    /// Lock the product and make sure the cart can hold `quantity` more of it.
    ///
    /// Units already held by the cart (other than `except`) count against
    /// the request; holds from the cart's own reservations do not reduce
    /// availability.
    async fn ensure_available(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        product: ProductUuid,
        except: Option<CartItemUuid>,
        quantity: u32,
    ) -> Result<(), CartsServiceError> {
        let level = self
            .products_repository
            .lock_stock_levels(tx, &[product], Some(cart))
            .await?
            .into_iter()
            .next()
            .ok_or(CartsServiceError::ProductNotFound)?;

        let held = self
            .items_repository
            .quantity_in_cart(tx, cart, product, except)
            .await?;

        let available = level.available().saturating_sub(held);

        if quantity > available {
            return Err(CartsServiceError::InsufficientStock {
                product,
                name: level.name,
                available,
                requested: quantity,
            });
        }

        Ok(())
    }

    async fn reserve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: &CartItemRecord,
    ) -> Result<(), sqlx::Error> {
        self.reservations_repository
            .create_reservation(
                tx,
                NewReservation {
                    uuid: ReservationUuid::new(),
                    product_uuid: item.product_uuid,
                    cart_item_uuid: item.uuid,
                    quantity: item.quantity,
                    ttl: self.reservation_ttl,
                },
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let mut cart = self.carts_repository.get_active_cart(&mut tx, user).await?;

        let items = self
            .items_repository
            .get_cart_items(&mut tx, cart.uuid)
            .await?;

        tx.commit().await?;

        cart.items.extend(items);

        Ok(cart)
    }

    async fn add_item(
        &self,
        user: UserUuid,
        item: NewCartItem,
    ) -> Result<CartItemRecord, CartsServiceError> {
        if item.quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .lock_or_create_active_cart(&mut tx, user)
            .await?;

        self.ensure_available(&mut tx, cart.uuid, item.product_uuid, None, item.quantity)
            .await?;

        let created = self
            .items_repository
            .create_cart_item(&mut tx, cart.uuid, item)
            .await?;

        self.reserve(&mut tx, &created).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_item(
        &self,
        user: UserUuid,
        item: CartItemUuid,
        update: CartItemUpdate,
    ) -> Result<CartItemRecord, CartsServiceError> {
        if update.quantity == Some(0) {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .lock_active_cart(&mut tx, user)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        let current = self
            .items_repository
            .get_cart_item(&mut tx, cart.uuid, item)
            .await?;

        let quantity = update.quantity.unwrap_or(current.quantity);
        let is_checked = update.is_checked.unwrap_or(current.is_checked);
        let requantified = quantity != current.quantity;

        if requantified {
            self.ensure_available(
                &mut tx,
                cart.uuid,
                current.product_uuid,
                Some(item),
                quantity,
            )
            .await?;
        }

        self.items_repository
            .update_cart_item(&mut tx, cart.uuid, item, quantity, is_checked)
            .await?;

        let updated = self
            .items_repository
            .get_cart_item(&mut tx, cart.uuid, item)
            .await?;

        if requantified {
            self.reservations_repository
                .release_for_cart_items(&mut tx, &[item])
                .await?;

            self.reserve(&mut tx, &updated).await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    async fn remove_item(&self, user: UserUuid, item: CartItemUuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .lock_active_cart(&mut tx, user)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        self.reservations_repository
            .release_for_cart_items(&mut tx, &[item])
            .await?;

        let rows_affected = self
            .items_repository
            .delete_cart_item(&mut tx, cart.uuid, item)
            .await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// The user's active cart with its items.
    async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError>;

    /// Add an item to the user's active cart, reserving its stock. The cart
    /// is created on first use.
    async fn add_item(
        &self,
        user: UserUuid,
        item: NewCartItem,
    ) -> Result<CartItemRecord, CartsServiceError>;

    /// Change an item's quantity or selection. A new quantity is re-validated
    /// against available stock and replaces the item's reservation.
    async fn update_item(
        &self,
        user: UserUuid,
        item: CartItemUuid,
        update: CartItemUpdate,
    ) -> Result<CartItemRecord, CartsServiceError>;

    /// Remove an item, releasing its reservation.
    async fn remove_item(&self, user: UserUuid, item: CartItemUuid) -> Result<(), CartsServiceError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use testresult::TestResult;

    use crate::{
        domain::{products::ProductsService, reservations::ReservationsService},
        test::{
            TestContext,
            helpers::{add_item, create_product},
        },
    };

    use super::*;

    #[tokio::test]
    async fn get_cart_without_active_cart_returns_not_found() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;

        let result = ctx.carts.get_cart(user).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn add_item_creates_cart_and_checked_item() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 10).await?;

        let item = add_item(&ctx, user, product, 2).await?;

        assert_eq!(item.quantity, 2);
        assert!(item.is_checked);

        let cart = ctx.carts.get_cart(user).await?;

        assert_eq!(cart.user_uuid, user);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.subtotal(), item.line_total());

        Ok(())
    }

    #[tokio::test]
    async fn add_item_reuses_the_active_cart() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 10).await?;

        let first = add_item(&ctx, user, product, 1).await?;
        let second = add_item(&ctx, user, product, 1).await?;

        assert_eq!(first.cart_uuid, second.cart_uuid);

        Ok(())
    }

    #[tokio::test]
    async fn add_item_zero_quantity_returns_invalid_quantity() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 10).await?;

        let result = add_item(&ctx, user, product, 0).await;

        assert!(
            matches!(result, Err(CartsServiceError::InvalidQuantity)),
            "expected InvalidQuantity, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn add_item_unknown_product_returns_product_not_found() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;

        let result = add_item(&ctx, user, ProductUuid::new(), 1).await;

        assert!(
            matches!(result, Err(CartsServiceError::ProductNotFound)),
            "expected ProductNotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn add_item_beyond_stock_returns_insufficient_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 3).await?;

        let result = add_item(&ctx, user, product, 4).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InsufficientStock {
                    available: 3,
                    requested: 4,
                    ..
                })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn other_carts_reservations_reduce_availability() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = ctx.create_user("alice").await;
        let bob = ctx.create_user("bob").await;
        let product = create_product(&ctx, 10).await?;

        add_item(&ctx, alice, product, 7).await?;

        let result = add_item(&ctx, bob, product, 4).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InsufficientStock {
                    available: 3,
                    requested: 4,
                    ..
                })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        add_item(&ctx, bob, product, 3).await?;

        Ok(())
    }

    #[tokio::test]
    async fn units_already_in_cart_count_against_new_items() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 10).await?;

        add_item(&ctx, user, product, 6).await?;
        add_item(&ctx, user, product, 4).await?;

        let result = add_item(&ctx, user, product, 1).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InsufficientStock { available: 0, .. })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn expired_reservations_do_not_block_other_carts() -> TestResult {
        let ctx = TestContext::with_reservation_ttl(Duration::ZERO).await;
        let alice = ctx.create_user("alice").await;
        let bob = ctx.create_user("bob").await;
        let product = create_product(&ctx, 10).await?;

        add_item(&ctx, alice, product, 8).await?;
        add_item(&ctx, bob, product, 8).await?;

        Ok(())
    }

    #[tokio::test]
    async fn update_item_quantity_replaces_reservation() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 10).await?;

        let item = add_item(&ctx, user, product, 2).await?;

        let updated = ctx
            .carts
            .update_item(
                user,
                item.uuid,
                CartItemUpdate {
                    quantity: Some(5),
                    is_checked: None,
                },
            )
            .await?;

        assert_eq!(updated.quantity, 5);
        assert!(updated.is_checked);

        let active = ctx.reservations.list_active(product).await?;

        assert_eq!(active.len(), 1);
        assert_eq!(active.iter().map(|r| r.quantity).sum::<u32>(), 5);

        Ok(())
    }

    #[tokio::test]
    async fn update_item_quantity_beyond_stock_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 4).await?;

        let item = add_item(&ctx, user, product, 2).await?;

        let result = ctx
            .carts
            .update_item(
                user,
                item.uuid,
                CartItemUpdate {
                    quantity: Some(5),
                    is_checked: None,
                },
            )
            .await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InsufficientStock {
                    available: 4,
                    requested: 5,
                    ..
                })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        let cart = ctx.carts.get_cart(user).await?;

        assert_eq!(cart.items.iter().map(|i| i.quantity).sum::<u32>(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn update_item_can_uncheck_without_touching_reservation() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 4).await?;

        let item = add_item(&ctx, user, product, 2).await?;

        let before = ctx.reservations.list_active(product).await?;

        let updated = ctx
            .carts
            .update_item(
                user,
                item.uuid,
                CartItemUpdate {
                    quantity: None,
                    is_checked: Some(false),
                },
            )
            .await?;

        assert!(!updated.is_checked);

        let after = ctx.reservations.list_active(product).await?;

        assert_eq!(
            before.iter().map(|r| r.uuid).collect::<Vec<_>>(),
            after.iter().map(|r| r.uuid).collect::<Vec<_>>()
        );

        Ok(())
    }

    #[tokio::test]
    async fn remove_item_releases_reservation() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 4).await?;

        let item = add_item(&ctx, user, product, 3).await?;

        ctx.carts.remove_item(user, item.uuid).await?;

        assert!(ctx.reservations.list_active(product).await?.is_empty());
        assert_eq!(ctx.products.get_product(product).await?.available(), 4);
        assert!(ctx.carts.get_cart(user).await?.items.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn remove_unknown_item_returns_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;
        let product = create_product(&ctx, 4).await?;

        add_item(&ctx, user, product, 1).await?;

        let result = ctx.carts.remove_item(user, CartItemUuid::new()).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn users_cannot_touch_each_others_items() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = ctx.create_user("alice").await;
        let bob = ctx.create_user("bob").await;
        let product = create_product(&ctx, 4).await?;

        let item = add_item(&ctx, alice, product, 1).await?;
        add_item(&ctx, bob, product, 1).await?;

        let result = ctx.carts.remove_item(bob, item.uuid).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }
}
