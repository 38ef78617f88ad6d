use clap::{Parser, Subcommand};
use storefront_app::database::{self, Db};

mod db;
mod product;
mod reservations;
mod token;
mod user;

#[derive(Debug, Parser)]
#[command(name = "storefront-app", about = "Storefront CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    User(user::UserCommand),
    Product(product::ProductCommand),
    Token(token::TokenCommand),
    Reservations(reservations::ReservationsCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::User(command) => user::run(command).await,
            Commands::Product(command) => product::run(command).await,
            Commands::Token(command) => token::run(command).await,
            Commands::Reservations(command) => reservations::run(command).await,
        }
    }
}

/// Connect with default pool settings for a one-shot command.
pub(crate) async fn connect(database_url: &str) -> Result<Db, String> {
    let pool = database::connect(database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    Ok(Db::new(pool))
}
