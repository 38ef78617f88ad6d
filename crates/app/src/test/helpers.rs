//! Test Helpers

use rust_decimal::Decimal;

use crate::{
    domain::{
        carts::{
            CartsService, CartsServiceError,
            data::NewCartItem,
            records::{CartItemRecord, CartItemUuid},
        },
        products::{ProductsService, ProductsServiceError, data::NewProduct, records::ProductUuid},
        users::{
            data::NewAddress,
            records::{AddressUuid, UserUuid},
        },
    },
    test::TestContext,
};

pub(crate) fn new_address(is_default: bool) -> NewAddress {
    NewAddress {
        uuid: AddressUuid::new(),
        line1: "1 Test Street".to_string(),
        city: "Leeds".to_string(),
        postcode: "LS1 1AA".to_string(),
        country: "GB".to_string(),
        is_default,
    }
}

pub(crate) async fn create_priced_product(
    ctx: &TestContext,
    price: Decimal,
    stock: u32,
) -> Result<ProductUuid, ProductsServiceError> {
    let uuid = ProductUuid::new();

    ctx.products
        .create_product(NewProduct {
            uuid,
            name: format!("Product {uuid}"),
            price,
            stock,
        })
        .await?;

    Ok(uuid)
}

pub(crate) async fn create_product(
    ctx: &TestContext,
    stock: u32,
) -> Result<ProductUuid, ProductsServiceError> {
    create_priced_product(ctx, Decimal::new(10_00, 2), stock).await
}

pub(crate) async fn add_item(
    ctx: &TestContext,
    user: UserUuid,
    product: ProductUuid,
    quantity: u32,
) -> Result<CartItemRecord, CartsServiceError> {
    ctx.carts
        .add_item(
            user,
            NewCartItem {
                uuid: CartItemUuid::new(),
                product_uuid: product,
                quantity,
            },
        )
        .await
}
