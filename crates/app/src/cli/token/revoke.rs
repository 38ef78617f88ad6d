use clap::Args;
use storefront_app::auth::{ApiTokenUuid, PgAuthService};
use uuid::Uuid;

use crate::cli::connect;

#[derive(Debug, Args)]
pub(crate) struct RevokeTokenArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Token UUID to revoke
    #[arg(long)]
    token_uuid: Uuid,
}

pub(crate) async fn run(args: RevokeTokenArgs) -> Result<(), String> {
    let service = PgAuthService::new(connect(&args.database_url).await?);

    let revoked = service
        .revoke_api_token(ApiTokenUuid::from_uuid(args.token_uuid))
        .await
        .map_err(|error| format!("failed to revoke token: {error}"))?;

    if !revoked {
        return Err(format!(
            "token {} is unknown or already revoked",
            args.token_uuid
        ));
    }

    println!("revoked token {}", args.token_uuid);

    Ok(())
}
