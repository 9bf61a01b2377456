use clap::{Parser, Subcommand};

mod db;
mod seed;

#[derive(Debug, Parser)]
#[command(name = "atelier-app", about = "Atelier storefront CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    Seed(seed::SeedArgs),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::Seed(args) => seed::run(args).await,
        }
    }
}
