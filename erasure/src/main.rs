// erasure/src/main.rs

use clap::Parser;

mod cli;
mod commands;
mod logging;
mod server;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // --- USE CASE: ACTION API ---
        Commands::Serve { config, host, port } => commands::serve::execute(config, host, port).await,

        // --- USE CASE: ONE-SHOT ACTION ---
        Commands::Execute { config, request } => commands::execute::execute(config, request).await,
    }
}
