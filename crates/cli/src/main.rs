//! Cartwright CLI - Database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! cw-cli migrate
//!
//! # Insert demo products and addresses
//! cw-cli seed
//!
//! # Seed only products, with a custom stock level
//! cw-cli seed --skip-addresses --stock 25
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run the embedded database migrations
//! - `seed` - Insert demo catalog rows and shipping addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cw-cli")]
#[command(author, version, about = "Cartwright CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo data
    Seed {
        /// Starting stock for each demo product
        #[arg(short, long, default_value_t = 10)]
        stock: i32,

        /// Owner of the demo shipping addresses
        #[arg(short, long, default_value_t = 1)]
        user_id: i32,

        /// Only insert products
        #[arg(long)]
        skip_addresses: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Seed {
            stock,
            user_id,
            skip_addresses,
        } => {
            let options = commands::seed::SeedOptions {
                stock,
                user_id,
                addresses: !skip_addresses,
            };
            let summary = commands::seed::run(&options).await?;
            tracing::info!(
                products = summary.products,
                addresses = summary.addresses,
                "Seeding complete"
            );
        }
    }
    Ok(())
}
