//! Delicious CLI - Database migrations and sample data.
//!
//! # Usage
//!
//! ```bash
//! # Apply the schema and create the session table
//! dl-cli migrate
//!
//! # Load the bundled sample users, stores and reviews
//! dl-cli seed load
//!
//! # Remove all users, stores, reviews and hearts
//! dl-cli seed delete
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dl-cli")]
#[command(author, version, about = "Delicious CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage sample data
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Load sample users, stores and reviews
    Load {
        /// Directory holding users.json, stores.json and reviews.json
        #[arg(short, long, default_value = "crates/cli/data")]
        dir: String,
    },
    /// Delete all users, stores, reviews and hearts
    Delete,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { action } => match action {
            SeedAction::Load { dir } => commands::seed::load(&dir).await?,
            SeedAction::Delete => commands::seed::delete().await?,
        },
    }
    Ok(())
}
