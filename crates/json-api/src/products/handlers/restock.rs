//! Restock Product Handler

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
    products::{errors::into_status_error, get::ProductResponse},
    state::State,
};

/// Restock Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RestockRequest {
    /// Units to add to stock
    pub quantity: u32,
}

/// Restock Product Handler
///
/// Adds units to a product's stock.
#[endpoint(
    tags("products"),
    summary = "Restock Product",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Product restocked"),
        (status_code = StatusCode::NOT_FOUND, description = "Product not found"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
    ),
)]
pub(crate) async fn handler(
    product: PathParam<Uuid>,
    json: JsonBody<RestockRequest>,
    depot: &mut Depot,
) -> Result<Json<ProductResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let product = state
        .app
        .products
        .restock(product.into_inner().into(), json.into_inner().quantity)
        .await
        .map_err(into_status_error)?;

    Ok(Json(product.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use storefront_app::domain::products::{
        MockProductsService, ProductsServiceError, records::ProductUuid,
    };

    use crate::test_helpers::{Mocks, make_product, service};

    use super::*;

    fn make_service(products: MockProductsService) -> Service {
        service(
            Mocks {
                products,
                ..Mocks::default()
            },
            Router::with_path("products/{product}/restock").post(handler),
        )
    }

    #[tokio::test]
    async fn test_restock_returns_updated_product() -> TestResult {
        let uuid = ProductUuid::new();
        let mut product = make_product(uuid);

        product.stock = 15;

        let mut products = MockProductsService::new();

        products
            .expect_restock()
            .once()
            .withf(move |u, quantity| *u == uuid && *quantity == 5)
            .return_once(move |_, _| Ok(product));

        let mut res = TestClient::post(format!("http://example.com/products/{uuid}/restock"))
            .json(&json!({ "quantity": 5 }))
            .send(&make_service(products))
            .await;

        let body: ProductResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.stock, 15);

        Ok(())
    }

    #[tokio::test]
    async fn test_restock_unknown_product_returns_404() -> TestResult {
        let uuid = ProductUuid::new();

        let mut products = MockProductsService::new();

        products
            .expect_restock()
            .once()
            .return_once(|_, _| Err(ProductsServiceError::NotFound));

        let res = TestClient::post(format!("http://example.com/products/{uuid}/restock"))
            .json(&json!({ "quantity": 5 }))
            .send(&make_service(products))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn test_restock_zero_units_returns_400() -> TestResult {
        let uuid = ProductUuid::new();

        let mut products = MockProductsService::new();

        products
            .expect_restock()
            .once()
            .return_once(|_, _| Err(ProductsServiceError::ZeroQuantity));

        let res = TestClient::post(format!("http://example.com/products/{uuid}/restock"))
            .json(&json!({ "quantity": 0 }))
            .send(&make_service(products))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
