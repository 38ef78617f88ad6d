use clap::Args;
use jiff::Timestamp;
use storefront_app::domain::reservations::{PgReservationsService, ReservationsService};

use crate::cli::connect;

#[derive(Debug, Args)]
pub(crate) struct ReapArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

pub(crate) async fn run(args: ReapArgs) -> Result<(), String> {
    let service = PgReservationsService::new(connect(&args.database_url).await?);

    let released = service
        .reap_expired(Timestamp::now())
        .await
        .map_err(|error| format!("failed to reap reservations: {error}"))?;

    println!("released {} expired reservations", released.len());

    Ok(())
}
