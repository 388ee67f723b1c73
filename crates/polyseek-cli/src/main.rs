//! Polyseek CLI
//!
//! Cross-language hybrid search over a local chunk store.

use anyhow::Result;
use clap::Parser;
use polyseek_core::Database;

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    // Open database
    let db = Database::open(&cli.database)?;
    db.initialize()?;

    match cli.command {
        Commands::Search(args) => commands::search::run(args, &db).await,
        Commands::Load(args) => commands::load::run(args, &db).await,
        Commands::Status(args) => commands::status::run(args, &db).await,
    }
}
