use clap::Args;
use storefront_app::domain::products::{PgProductsService, ProductsService, records::ProductUuid};
use uuid::Uuid;

use crate::cli::connect;

#[derive(Debug, Args)]
pub(crate) struct RestockArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long)]
    product_uuid: Uuid,

    /// Units to add
    #[arg(long)]
    quantity: u32,
}

pub(crate) async fn run(args: RestockArgs) -> Result<(), String> {
    let service = PgProductsService::new(connect(&args.database_url).await?);

    let product = service
        .restock(ProductUuid::from_uuid(args.product_uuid), args.quantity)
        .await
        .map_err(|error| format!("failed to restock product: {error}"))?;

    println!("product_uuid: {}", product.uuid);
    println!("stock: {}", product.stock);
    println!("available: {}", product.available());

    Ok(())
}
