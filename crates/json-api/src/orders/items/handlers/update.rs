//! Update Order Item Handler

use std::sync::Arc;

use salvo::{
    oapi::{
        ToSchema,
        extract::{JsonBody, PathParam},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, get::OrderResponse},
    state::State,
};

/// Update Order Item Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdateOrderItemRequest {
    pub quantity: u32,
}

/// Update Order Item Handler
///
/// Changes a line's quantity on a pending order, debiting or restoring the
/// difference, and returns the recomputed order.
#[endpoint(
    tags("orders"),
    summary = "Update Order Item Quantity",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Order updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Order or item not found"),
        (status_code = StatusCode::CONFLICT, description = "Insufficient stock or order not pending"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    item: PathParam<Uuid>,
    json: JsonBody<UpdateOrderItemRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let user = depot.user_uuid_or_401()?;

    let order = state
        .app
        .orders
        .update_order_item_quantity(
            user,
            order.into_inner().into(),
            item.into_inner().into(),
            json.into_inner().quantity,
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use storefront_app::domain::{
        orders::{
            MockOrdersService, OrdersServiceError,
            records::{OrderItemUuid, OrderStatus, OrderUuid},
        },
        products::records::ProductUuid,
    };

    use crate::test_helpers::{Mocks, TEST_USER_UUID, make_order, service};

    use super::*;

    fn make_service(orders: MockOrdersService) -> Service {
        service(
            Mocks {
                orders,
                ..Mocks::default()
            },
            Router::with_path("orders/{order}/items/{item}").put(handler),
        )
    }

    #[tokio::test]
    async fn test_update_quantity_returns_order() -> TestResult {
        let uuid = OrderUuid::new();
        let item = OrderItemUuid::new();
        let order = make_order(uuid, OrderStatus::Pending);

        let mut orders = MockOrdersService::new();

        orders
            .expect_update_order_item_quantity()
            .once()
            .withf(move |user, o, i, quantity| {
                *user == TEST_USER_UUID && *o == uuid && *i == item && *quantity == 2
            })
            .return_once(move |_, _, _, _| Ok(order));

        let mut res = TestClient::put(format!("http://example.com/orders/{uuid}/items/{item}"))
            .json(&json!({ "quantity": 2 }))
            .send(&make_service(orders))
            .await;

        let body: OrderResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.uuid, uuid.into_uuid());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_beyond_stock_returns_409() -> TestResult {
        let uuid = OrderUuid::new();
        let item = OrderItemUuid::new();

        let mut orders = MockOrdersService::new();

        orders
            .expect_update_order_item_quantity()
            .once()
            .return_once(|_, _, _, _| {
                Err(OrdersServiceError::InsufficientStock {
                    product: ProductUuid::new(),
                    name: "Widget".to_string(),
                    available: 0,
                    requested: 5,
                })
            });

        let res = TestClient::put(format!("http://example.com/orders/{uuid}/items/{item}"))
            .json(&json!({ "quantity": 7 }))
            .send(&make_service(orders))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_to_zero_returns_400() -> TestResult {
        let uuid = OrderUuid::new();
        let item = OrderItemUuid::new();

        let mut orders = MockOrdersService::new();

        orders
            .expect_update_order_item_quantity()
            .once()
            .return_once(|_, _, _, _| Err(OrdersServiceError::InvalidQuantity));

        let res = TestClient::put(format!("http://example.com/orders/{uuid}/items/{item}"))
            .json(&json!({ "quantity": 0 }))
            .send(&make_service(orders))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
