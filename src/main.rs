use anyhow::Result;
use clap::Parser;

use navgrep_core::cli::{Cli, Commands};
use navgrep_core::lookup::{self, Operation};
use navgrep_core::service;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Definition(args) => print_json(&lookup::execute(Operation::Definition, args).await?)?,
        Commands::References(args) => print_json(&lookup::execute(Operation::References, args).await?)?,
        Commands::Hover(args) => print_json(&lookup::execute(Operation::Hover, args).await?)?,
        Commands::Serve(args) => service::serve(args).await?,
        Commands::Languages => print_json(&lookup::languages()?)?,
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
