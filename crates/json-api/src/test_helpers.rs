//! Test helpers.

use std::sync::Arc;

use jiff::Timestamp;
use rust_decimal::Decimal;
use salvo::{affix_state::inject, prelude::*};
use uuid::Uuid;

use storefront_app::{
    admission::{
        LogAlertSink, MemoryCounterCache, RateLimitConfig, RateLimiter, Throttle, ThrottleConfig,
    },
    auth::MockAuthService,
    context::AppContext,
    domain::{
        carts::{
            MockCartsService,
            records::{CartItemRecord, CartItemUuid, CartRecord, CartUuid},
        },
        orders::{
            MockOrdersService,
            records::{OrderItemRecord, OrderItemUuid, OrderRecord, OrderStatus, OrderUuid},
        },
        products::{
            MockProductsService,
            records::{ProductRecord, ProductUuid},
        },
        reservations::MockReservationsService,
        users::{
            MockUsersService,
            records::{AddressUuid, UserUuid},
        },
    },
};

use crate::{admission::ClientIpResolver, extensions::*, state::State};

pub(crate) const TEST_USER_UUID: UserUuid = UserUuid::from_uuid(Uuid::nil());

/// Service mocks; any call without a configured expectation fails the test.
#[derive(Default)]
pub(crate) struct Mocks {
    pub(crate) users: MockUsersService,
    pub(crate) products: MockProductsService,
    pub(crate) carts: MockCartsService,
    pub(crate) orders: MockOrdersService,
    pub(crate) reservations: MockReservationsService,
    pub(crate) auth: MockAuthService,
}

impl Mocks {
    pub(crate) fn into_app(self) -> AppContext {
        AppContext {
            users: Arc::new(self.users),
            products: Arc::new(self.products),
            carts: Arc::new(self.carts),
            orders: Arc::new(self.orders),
            reservations: Arc::new(self.reservations),
            auth: Arc::new(self.auth),
        }
    }
}

/// State with admission control at its defaults over an in-memory counter.
pub(crate) fn state(app: AppContext) -> Arc<State> {
    State::new(
        app,
        RateLimiter::new(
            RateLimitConfig::default(),
            Arc::new(MemoryCounterCache::new()),
        ),
        Throttle::new(&ThrottleConfig::default()),
        Arc::new(LogAlertSink),
        ClientIpResolver::default(),
    )
}

#[salvo::handler]
pub(crate) async fn inject_user(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    depot.insert_user_uuid(TEST_USER_UUID);
    ctrl.call_next(req, depot, res).await;
}

/// A service for `route` with state injected and [`TEST_USER_UUID`] signed in.
pub(crate) fn service(mocks: Mocks, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state(mocks.into_app())))
            .hoop(inject_user)
            .push(route),
    )
}

pub(crate) fn make_product(uuid: ProductUuid) -> ProductRecord {
    ProductRecord {
        uuid,
        name: "Widget".to_string(),
        price: Decimal::new(10_00, 2),
        stock: 10,
        reserved: 2,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
        deleted_at: None,
    }
}

pub(crate) fn make_cart_item(
    uuid: CartItemUuid,
    product: ProductUuid,
    quantity: u32,
) -> CartItemRecord {
    CartItemRecord {
        uuid,
        cart_uuid: CartUuid::from_uuid(Uuid::nil()),
        product_uuid: product,
        product_name: "Widget".to_string(),
        price: Decimal::new(10_00, 2),
        quantity,
        is_checked: true,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

pub(crate) fn make_cart(items: Vec<CartItemRecord>) -> CartRecord {
    CartRecord {
        uuid: CartUuid::from_uuid(Uuid::nil()),
        user_uuid: TEST_USER_UUID,
        items,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

pub(crate) fn make_order(uuid: OrderUuid, status: OrderStatus) -> OrderRecord {
    let item = OrderItemRecord {
        uuid: OrderItemUuid::from_uuid(Uuid::nil()),
        order_uuid: uuid,
        product_uuid: ProductUuid::from_uuid(Uuid::nil()),
        quantity: 2,
        price: Decimal::new(10_00, 2),
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    };

    OrderRecord {
        uuid,
        user_uuid: TEST_USER_UUID,
        address_uuid: AddressUuid::from_uuid(Uuid::nil()),
        code: "ORD-20260301-ABCD2345".to_string(),
        status,
        total: item.line_total(),
        items: vec![item],
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}
