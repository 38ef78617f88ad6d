use clap::Args;
use storefront_app::{auth::PgAuthService, domain::users::records::UserUuid};
use uuid::Uuid;

use crate::cli::connect;

#[derive(Debug, Args)]
pub(crate) struct CreateTokenArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Customer the token signs in as
    #[arg(long)]
    user_uuid: Uuid,
}

pub(crate) async fn run(args: CreateTokenArgs) -> Result<(), String> {
    let service = PgAuthService::new(connect(&args.database_url).await?);

    let issued = service
        .issue_api_token(UserUuid::from_uuid(args.user_uuid))
        .await
        .map_err(|error| format!("failed to create token: {error}"))?;

    println!("token_uuid: {}", issued.metadata.uuid);
    println!("user_uuid: {}", issued.metadata.user_uuid);
    println!("created_at: {}", issued.metadata.created_at);
    println!();
    println!("Authorization: Bearer {}", issued.token);
    println!();
    println!("the raw token is not stored; copy it now");

    Ok(())
}
