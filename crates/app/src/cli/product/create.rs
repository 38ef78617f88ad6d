use clap::Args;
use rust_decimal::Decimal;
use storefront_app::domain::products::{
    PgProductsService, ProductsService, data::NewProduct, records::ProductUuid,
};

use crate::cli::connect;

#[derive(Debug, Args)]
pub(crate) struct CreateProductArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long)]
    name: String,

    /// Unit price, e.g. 12.50
    #[arg(long)]
    price: Decimal,

    /// Opening stock level
    #[arg(long, default_value_t = 0)]
    stock: u32,
}

pub(crate) async fn run(args: CreateProductArgs) -> Result<(), String> {
    let service = PgProductsService::new(connect(&args.database_url).await?);

    let product = service
        .create_product(NewProduct {
            uuid: ProductUuid::new(),
            name: args.name,
            price: args.price,
            stock: args.stock,
        })
        .await
        .map_err(|error| format!("failed to create product: {error}"))?;

    println!("product_uuid: {}", product.uuid);
    println!("price: {}", product.price);
    println!("stock: {}", product.stock);

    Ok(())
}
