use clap::Args;
use storefront_app::domain::users::{
    PgUsersService, UsersService, data::NewUser, records::UserUuid,
};
use uuid::Uuid;

use crate::cli::connect;

#[derive(Debug, Args)]
pub(crate) struct CreateUserArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Unique username
    #[arg(long)]
    username: String,

    /// Optional user UUID; generated when omitted
    #[arg(long)]
    user_uuid: Option<Uuid>,
}

pub(crate) async fn run(args: CreateUserArgs) -> Result<(), String> {
    let service = PgUsersService::new(connect(&args.database_url).await?);

    let user = service
        .create_user(NewUser {
            uuid: args.user_uuid.map_or_else(UserUuid::new, UserUuid::from_uuid),
            username: args.username,
        })
        .await
        .map_err(|error| format!("failed to create user: {error}"))?;

    println!("user_uuid: {}", user.uuid);
    println!("username: {}", user.username);

    Ok(())
}
