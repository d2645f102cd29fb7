//! Author Store CLI - database migrations and store operations.
//!
//! # Usage
//!
//! ```bash
//! # Run the store schema migrations
//! store-cli migrate storefront
//!
//! # Create the session tables
//! store-cli migrate sessions
//!
//! # Both
//! store-cli migrate all
//!
//! # Create a staff account (or promote an existing user)
//! store-cli admin create -u alice -e alice@example.com -p 'correct horse'
//!
//! # Low-stock report; hides sold-out products and emails the report
//! store-cli inventory check --send-email
//!
//! # Load categories and products from YAML
//! store-cli seed catalog -f catalog.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "store-cli")]
#[command(author, version, about = "Author Store CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage staff accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Stock maintenance
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run the store schema migrations
    Storefront,
    /// Create the `tower_sessions` tables
    Sessions,
    /// Run all migrations
    All,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a staff account, or promote an existing user
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// List staff accounts
    List,
}

#[derive(Subcommand)]
enum InventoryAction {
    /// Report low stock and hide sold-out products
    Check {
        /// Email the low-stock report to `STORE_ALERT_EMAIL`
        #[arg(long)]
        send_email: bool,

        /// Report only; change nothing and send nothing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert categories and products by slug
    Catalog {
        /// Path to the catalog YAML file
        #[arg(short, long)]
        file: String,
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Sessions => commands::migrate::sessions().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::sessions().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                password,
            } => {
                commands::admin::create_user(&username, &email, &password).await?;
            }
            AdminAction::List => commands::admin::list_users().await?,
        },
        Commands::Inventory { action } => match action {
            InventoryAction::Check {
                send_email,
                dry_run,
            } => commands::inventory::check(send_email, dry_run).await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
    }
    Ok(())
}
