//! Update Cart Item Handler

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

use storefront_app::domain::carts::data::CartItemUpdate;

use crate::{
    carts::{errors::into_status_error, get::CartItemResponse},
    extensions::*,
    state::State,
};

/// Update Cart Item Request
///
/// Absent fields are left unchanged.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdateCartItemRequest {
    pub quantity: Option<u32>,
    pub is_checked: Option<bool>,
}

impl From<UpdateCartItemRequest> for CartItemUpdate {
    fn from(request: UpdateCartItemRequest) -> Self {
        CartItemUpdate {
            quantity: request.quantity,
            is_checked: request.is_checked,
        }
    }
}

/// Update Cart Item Handler
///
/// Changes an item's quantity or checkout selection.
#[endpoint(
    tags("carts"),
    summary = "Update Cart Item",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Cart item updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart item not found"),
        (status_code = StatusCode::CONFLICT, description = "Insufficient stock"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
    ),
)]
pub(crate) async fn handler(
    item: PathParam<Uuid>,
    json: JsonBody<UpdateCartItemRequest>,
    depot: &mut Depot,
) -> Result<Json<CartItemResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let user = depot.user_uuid_or_401()?;

    let item = state
        .app
        .carts
        .update_item(user, item.into_inner().into(), json.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(item.into()))
}
