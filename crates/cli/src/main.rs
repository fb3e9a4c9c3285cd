//! Corner Shop CLI - drive the storefront pages from a terminal.
//!
//! Every command runs one page action against the shop server and prints
//! what the page would show: the regions it rendered, any alerts and any
//! navigation.
//!
//! # Usage
//!
//! ```bash
//! # Show the signed-in cart
//! shop cart show
//!
//! # Add a product to the guest cart
//! shop cart add 42 --name Widget --price 9.99
//!
//! # Apply a coupon on the order summary
//! shop coupon apply SAVE10
//!
//! # Activate an address
//! shop address activate 7
//! ```
//!
//! # Environment Variables
//!
//! - `SHOP_BASE_URL` - Shop server base URL (required)
//! - `SHOP_COOKIES` - Raw `Cookie` header with `sessionid` and `csrftoken`
//! - `SHOP_AUTHENTICATED` - Whether the session is signed in
//! - `SHOP_STORAGE_PATH` - File backing client storage
//! - `SHOP_REQUEST_TIMEOUT_SECS` - Per-request timeout
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Error tracking

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shop_core::{AddressId, Price, ProductId};
use shop_storefront::config::StorefrontConfig;

mod commands;

use commands::{CliError, Shell};

#[derive(Parser)]
#[command(name = "shop")]
#[command(author, version, about = "Corner Shop storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cart page actions
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Coupon actions on the order summary
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
    /// Show the order summary page
    Summary,
    /// Manage the address book
    Address {
        /// Draw the list the way the order summary does
        #[arg(long, global = true)]
        checkout: bool,

        #[command(subcommand)]
        action: AddressCommand,
    },
    /// Show the profile page
    Profile,
    /// Print the `local_cart` value the sign-in form submits
    SignInPayload,
    /// Finish a sign-in; drops the guest cart when the query carries the
    /// success marker
    SignInFinish {
        /// Query string the sign-in page came back with
        query: String,
    },
    /// Merge the guest cart into the signed-in cart
    Merge,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        product_id: ProductId,

        /// Product name (kept in the guest cart)
        #[arg(short, long, default_value = "")]
        name: String,

        /// Unit price (kept in the guest cart)
        #[arg(short, long, default_value = "0")]
        price: Price,
    },
    /// Set a line's quantity; below one removes it
    Update {
        /// Product ID
        product_id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Product ID
        product_id: ProductId,
    },
    /// Turn the cart into an order
    Checkout,
    /// Show the cart badge
    Badge,
}

#[derive(Subcommand)]
enum CouponAction {
    /// Check a code and apply it to the active order
    Apply {
        /// Coupon code
        code: String,
    },
    /// Confirm the active order with the applied coupon
    Confirm,
}

#[derive(Subcommand)]
enum AddressCommand {
    /// List addresses
    List,
    /// Create an address
    Create {
        #[arg(long)]
        country: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        zipcode: String,
    },
    /// Make an address the active one
    Activate { id: AddressId },
    /// Stop using an address
    Deactivate { id: AddressId },
    /// Delete an address
    Delete { id: AddressId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
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

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env().map_err(CliError::from) {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not up yet
            #[allow(clippy::print_stderr)]
            {
                eprintln!("{e}");
            }
            std::process::exit(2);
        }
    };

    // Sentry goes first so the tracing layer has a client to report to
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shop_cli=info,shop_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let shell = Shell::new(config)?;

    let result = match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shell).await,
            CartAction::Add {
                product_id,
                name,
                price,
            } => commands::cart::add(&shell, product_id, name, price).await,
            CartAction::Update {
                product_id,
                quantity,
            } => commands::cart::update(&shell, product_id, quantity).await,
            CartAction::Remove { product_id } => commands::cart::remove(&shell, product_id).await,
            CartAction::Checkout => commands::cart::checkout(&shell).await,
            CartAction::Badge => commands::cart::badge(&shell).await,
        },
        Commands::Coupon { action } => match action {
            CouponAction::Apply { code } => commands::order::apply_coupon(&shell, &code).await,
            CouponAction::Confirm => commands::order::confirm(&shell).await,
        },
        Commands::Summary => commands::order::summary(&shell).await,
        Commands::Address { checkout, action } => {
            let addresses = commands::address::Addresses::new(&shell, checkout);
            match action {
                AddressCommand::List => addresses.list().await,
                AddressCommand::Create {
                    country,
                    city,
                    address,
                    zipcode,
                } => {
                    addresses
                        .create(shop_core::NewAddress {
                            country,
                            city,
                            address,
                            zipcode,
                        })
                        .await
                }
                AddressCommand::Activate { id } => {
                    addresses.toggle(id, shop_core::AddressAction::Activate).await
                }
                AddressCommand::Deactivate { id } => {
                    addresses.toggle(id, shop_core::AddressAction::Deactivate).await
                }
                AddressCommand::Delete { id } => addresses.delete(id).await,
            }
        }
        Commands::Profile => commands::account::profile(&shell).await,
        Commands::SignInPayload => commands::account::sign_in_payload(&shell),
        Commands::SignInFinish { query } => commands::account::sign_in_finish(&shell, &query),
        Commands::Merge => commands::cart::merge(&shell).await,
    };

    // Whatever the page drew before a failure is still worth seeing
    shell.print();
    result
}
