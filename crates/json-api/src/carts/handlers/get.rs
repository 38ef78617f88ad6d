//! Get Cart Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_app::domain::carts::records::{CartItemRecord, CartRecord};

use crate::{carts::errors::into_status_error, extensions::*, state::State};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartItemResponse {
    pub uuid: Uuid,
    pub product_uuid: Uuid,
    pub product_name: String,

    /// Live unit price as a decimal string
    pub price: String,

    pub quantity: u32,

    /// Whether the item is selected for checkout
    pub is_checked: bool,

    pub line_total: String,
}

impl From<CartItemRecord> for CartItemResponse {
    fn from(item: CartItemRecord) -> Self {
        CartItemResponse {
            uuid: item.uuid.into(),
            product_uuid: item.product_uuid.into(),
            line_total: item.line_total().to_string(),
            product_name: item.product_name,
            price: item.price.to_string(),
            quantity: item.quantity,
            is_checked: item.is_checked,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartResponse {
    pub uuid: Uuid,
    pub items: Vec<CartItemResponse>,
    pub subtotal: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CartRecord> for CartResponse {
    fn from(cart: CartRecord) -> Self {
        CartResponse {
            uuid: cart.uuid.into(),
            subtotal: cart.subtotal().to_string(),
            created_at: cart.created_at.to_string(),
            updated_at: cart.updated_at.to_string(),
            items: cart.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Get Cart Handler
///
/// Returns the caller's active cart.
#[endpoint(
    tags("carts"),
    summary = "Get Cart",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Active cart"),
        (status_code = StatusCode::NOT_FOUND, description = "No active cart"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let user = depot.user_uuid_or_401()?;

    let cart = state
        .app
        .carts
        .get_cart(user)
        .await
        .map_err(into_status_error)?;

    Ok(Json(cart.into()))
}
