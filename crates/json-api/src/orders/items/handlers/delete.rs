//! Delete Order Item Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, get::OrderResponse},
    state::State,
};

/// Delete Order Item Handler
///
/// Removes a line from a pending order, restoring its stock, and returns the
/// recomputed order.
#[endpoint(
    tags("orders"),
    summary = "Remove Order Item",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Order updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Order or item not found"),
        (status_code = StatusCode::CONFLICT, description = "Order not pending"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    item: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let user = depot.user_uuid_or_401()?;

    let order = state
        .app
        .orders
        .remove_order_item(user, order.into_inner().into(), item.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}
