//! V Diamond CLI - drive the storefront client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Build a cart
//! vd-cli cart add ring-001 --name "Solitaire Ring" --price 2499.00
//! vd-cli cart update ring-001 2
//! vd-cli cart show
//!
//! # Sign in (password is read from stdin)
//! echo "$PASSWORD" | vd-cli login -e jane@example.com
//! vd-cli whoami
//!
//! # Account pages
//! vd-cli orders
//! vd-cli profile --name "Jane Doe" --email jane@example.com
//!
//! # Place the order
//! vd-cli checkout --full-name "Jane Doe" --address "1 Carat Way" \
//!     --city Antwerp --postal-code 2018 --country BE --payment-token pm_123
//! ```
//!
//! # Commands
//!
//! - `cart` - Add, remove, update, show and clear cart lines
//! - `login` / `register` / `confirm-email` / `oauth` - Authenticate
//! - `whoami` - Show the signed-in user
//! - `orders` / `profile` - Order history and profile settings
//! - `logout` - Sign out
//! - `checkout` - Submit the cart as an order
//!
//! Configuration comes from the environment; see
//! [`vdiamond_storefront::StorefrontClientConfig`].

#![cfg_attr(not(test), forbid(unsafe_code))]
// Command output is the point of a CLI.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vdiamond_storefront::navigation::paths;
use vdiamond_storefront::{
    FileStore, MemoryNavigator, Navigator, Storefront, StorefrontClientConfig,
};

mod commands;

use commands::CliError;

/// File holding the cart between invocations. The cart record is removed by
/// `cart clear` and after a successful checkout.
const SESSION_STORE_FILE: &str = "session.json";

#[derive(Parser)]
#[command(name = "vd-cli")]
#[command(author, version, about = "V Diamond storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Sign in with email and password (password read from stdin)
    Login {
        #[arg(short, long)]
        email: String,
    },
    /// Create an account (password read from stdin)
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
    },
    /// Confirm a new account with the token from the confirmation email
    ConfirmEmail { token: String },
    /// Google sign-in
    Oauth {
        #[command(subcommand)]
        action: OauthAction,
    },
    /// Show the signed-in user
    Whoami,
    /// Sign out
    Logout,
    /// List past orders
    Orders,
    /// Update profile settings
    Profile(commands::account::ProfileArgs),
    /// Submit the cart as an order
    Checkout(commands::checkout::CheckoutArgs),
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product
    Add {
        /// Product id
        id: String,
        #[arg(short, long)]
        name: String,
        /// Unit price, e.g. 2499.00
        #[arg(short, long)]
        price: Decimal,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(long, default_value = "")]
        image: String,
    },
    /// Remove a product
    Remove { id: String },
    /// Set the quantity of a product already in the cart
    Update {
        id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Print the cart
    Show,
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OauthAction {
    /// Print the URL that starts Google sign-in
    Url,
    /// Finish sign-in with the token from the callback
    Complete { token: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vdiamond_storefront=info,vd_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be up before the subscriber so the tracing layer binds to it.
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let navigator = Arc::new(MemoryNavigator::default());
    let result = run(cli, config, Arc::<MemoryNavigator>::clone(&navigator)).await;

    if navigator.last_navigation().as_deref() == Some(paths::SESSION_EXPIRED) {
        eprintln!("Your session has expired. Run `vd-cli login` to sign in again.");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(
    cli: Cli,
    config: StorefrontClientConfig,
    navigator: Arc<dyn Navigator>,
) -> Result<(), CliError> {
    let short_lived = Arc::new(FileStore::new(config.data_dir.join(SESSION_STORE_FILE)));
    let durable = Arc::new(FileStore::new(config.durable_store_path()));
    let storefront = Storefront::new(config, short_lived, durable, navigator)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Add {
                id,
                name,
                price,
                quantity,
                image,
            } => commands::cart::add(&storefront, id, name, price, quantity, image)?,
            CartAction::Remove { id } => commands::cart::remove(&storefront, id),
            CartAction::Update { id, quantity } => commands::cart::update(&storefront, id, quantity)?,
            CartAction::Show => commands::cart::show(&storefront),
            CartAction::Clear => commands::cart::clear(&storefront),
        },
        Commands::Login { email } => commands::auth::login(&storefront, &email).await?,
        Commands::Register { name, email } => {
            commands::auth::register(&storefront, &name, &email).await?;
        }
        Commands::ConfirmEmail { token } => {
            commands::auth::confirm_email(&storefront, &token).await?;
        }
        Commands::Oauth { action } => match action {
            OauthAction::Url => commands::auth::oauth_url(&storefront)?,
            OauthAction::Complete { token } => {
                commands::auth::oauth_complete(&storefront, token).await?;
            }
        },
        Commands::Whoami => commands::auth::whoami(&storefront).await,
        Commands::Logout => commands::auth::logout(&storefront).await,
        Commands::Orders => commands::account::orders(&storefront).await?,
        Commands::Profile(args) => commands::account::profile(&storefront, args).await?,
        Commands::Checkout(args) => commands::checkout::run(&storefront, args).await?,
    }
    Ok(())
}
