//! Modern Shop CLI - session store migration and order history lookup.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! ms-cli migrate
//!
//! # Print a customer's order history as JSON
//! ms-cli orders --email shopper@example.com
//!
//! # Same, aborting on the first order that cannot be enriched
//! ms-cli orders --email shopper@example.com --fail-fast
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the `tower_sessions` schema and table
//! - `orders` - Assemble one customer's order history from Firestore and Stripe

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ms-cli")]
#[command(author, version, about = "Modern Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session store table
    Migrate,
    /// Print a customer's order history as JSON
    Orders {
        /// Customer email the orders are stored under
        #[arg(short, long)]
        email: String,

        /// Abort on the first order that cannot be enriched
        #[arg(long)]
        fail_fast: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modern_shop_storefront=info,ms_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::session_store().await?,
        Commands::Orders { email, fail_fast } => {
            commands::orders::print_history(&email, fail_fast).await?;
        }
    }
    Ok(())
}
