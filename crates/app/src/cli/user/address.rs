use clap::Args;
use storefront_app::domain::users::{
    PgUsersService, UsersService,
    data::NewAddress,
    records::{AddressUuid, UserUuid},
};
use uuid::Uuid;

use crate::cli::connect;

#[derive(Debug, Args)]
pub(crate) struct AddressArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// User that owns the address
    #[arg(long)]
    user_uuid: Uuid,

    #[arg(long)]
    line1: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    postcode: String,

    /// ISO 3166-1 alpha-2 country code
    #[arg(long)]
    country: String,

    /// Make this the user's default shipping address
    #[arg(long)]
    default: bool,
}

pub(crate) async fn run(args: AddressArgs) -> Result<(), String> {
    let service = PgUsersService::new(connect(&args.database_url).await?);

    let address = service
        .add_address(
            UserUuid::from_uuid(args.user_uuid),
            NewAddress {
                uuid: AddressUuid::new(),
                line1: args.line1,
                city: args.city,
                postcode: args.postcode,
                country: args.country,
                is_default: args.default,
            },
        )
        .await
        .map_err(|error| format!("failed to add address: {error}"))?;

    println!("address_uuid: {}", address.uuid);
    println!("is_default: {}", address.is_default);

    Ok(())
}
