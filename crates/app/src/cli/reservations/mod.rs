use clap::{Args, Subcommand};

mod reap;

#[derive(Debug, Args)]
pub(crate) struct ReservationsCommand {
    #[command(subcommand)]
    command: ReservationsSubcommand,
}

#[derive(Debug, Subcommand)]
enum ReservationsSubcommand {
    /// Release every expired stock reservation once
    Reap(reap::ReapArgs),
}

pub(crate) async fn run(command: ReservationsCommand) -> Result<(), String> {
    match command.command {
        ReservationsSubcommand::Reap(args) => reap::run(args).await,
    }
}
