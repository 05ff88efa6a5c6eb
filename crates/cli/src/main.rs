//! Emporium CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (schema + session table)
//! emporium migrate
//!
//! # Load categories, products, users, reviews and orders
//! emporium seed seed/catalog.yaml [--clear]
//!
//! # Create a staff account
//! emporium user create -e admin@example.com -n "Admin Name" -p 'passphrase' -r admin
//!
//! # Change an account's role
//! emporium user set-role -e clerk@example.com -r employee
//!
//! # Create unmapped products at Polar
//! emporium products sync
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "emporium")]
#[command(author, version, about = "Emporium CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from a YAML file
    Seed {
        /// Path to the seed file
        file: String,

        /// Empty catalog, carts and orders before seeding (accounts are kept)
        #[arg(long)]
        clear: bool,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`admin`, `employee`, `customer`)
        #[arg(short, long, default_value = "customer")]
        role: String,
    },
    /// Change the role of an existing user
    SetRole {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New role (`admin`, `employee`, `customer`)
        #[arg(short, long)]
        role: String,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Create every product without a Polar ID at Polar
    Sync,
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
        Commands::Seed { file, clear } => commands::seed::run(&file, clear).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
                role,
            } => {
                commands::users::create(&email, &name, &password, &role).await?;
            }
            UserAction::SetRole { email, role } => {
                commands::users::set_role(&email, &role).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductAction::Sync => {
                commands::products::sync().await?;
            }
        },
    }
    Ok(())
}
