//! Cancel Order Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, get::OrderResponse},
    state::State,
};

/// Cancel Order Handler
///
/// Cancels a pending or confirmed order, returning every item's quantity to stock.
#[endpoint(
    tags("orders"),
    summary = "Cancel Order",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Order updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Order not found"),
        (status_code = StatusCode::CONFLICT, description = "Order is not in a state that allows this"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let user = depot.user_uuid_or_401()?;

    let order = state
        .app
        .orders
        .cancel_order(user, order.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use storefront_app::domain::orders::{
        MockOrdersService, OrdersServiceError,
        records::{OrderStatus, OrderUuid},
    };

    use crate::test_helpers::{Mocks, TEST_USER_UUID, make_order, service};

    use super::*;

    fn make_service(orders: MockOrdersService) -> Service {
        service(
            Mocks {
                orders,
                ..Mocks::default()
            },
            Router::with_path("orders/{order}/cancel").post(handler),
        )
    }

    #[tokio::test]
    async fn test_cancel_order() -> TestResult {
        let uuid = OrderUuid::new();
        let order = make_order(uuid, OrderStatus::Cancelled);

        let mut orders = MockOrdersService::new();

        orders
            .expect_cancel_order()
            .once()
            .withf(move |user, u| *user == TEST_USER_UUID && *u == uuid)
            .return_once(move |_, _| Ok(order));

        let mut res = TestClient::post(format!("http://example.com/orders/{uuid}/cancel"))
            .send(&make_service(orders))
            .await;

        let body: OrderResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.status, "cancelled");

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_cancelled_order_returns_409() -> TestResult {
        let uuid = OrderUuid::new();

        let mut orders = MockOrdersService::new();

        orders.expect_cancel_order().once().return_once(|_, _| {
            Err(OrdersServiceError::InvalidStatus {
                status: OrderStatus::Cancelled,
            })
        });

        let res = TestClient::post(format!("http://example.com/orders/{uuid}/cancel"))
            .send(&make_service(orders))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_unknown_order_returns_404() -> TestResult {
        let uuid = OrderUuid::new();

        let mut orders = MockOrdersService::new();

        orders
            .expect_cancel_order()
            .once()
            .return_once(|_, _| Err(OrdersServiceError::NotFound));

        let res = TestClient::post(format!("http://example.com/orders/{uuid}/cancel"))
            .send(&make_service(orders))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
