use clap::{Args, Subcommand};

mod address;
mod create;

#[derive(Debug, Args)]
pub(crate) struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Debug, Subcommand)]
enum UserSubcommand {
    Create(create::CreateUserArgs),
    /// Add a shipping address
    Address(address::AddressArgs),
}

pub(crate) async fn run(command: UserCommand) -> Result<(), String> {
    match command.command {
        UserSubcommand::Create(args) => create::run(args).await,
        UserSubcommand::Address(args) => address::run(args).await,
    }
}
