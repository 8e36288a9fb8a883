//! FreshCart CLI - drive the storefront client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password from FRESHCART_PASSWORD or --password)
//! freshcart login -e an@market.vn
//!
//! # Browse and fill the cart
//! freshcart categories
//! freshcart products --category 2
//! freshcart cart add 5 --quantity 2
//!
//! # Place an order for two cart lines with a promo code
//! freshcart checkout --line 41 --line 42 --promo SAVE5
//!
//! # Track and cancel orders
//! freshcart orders list --status preparing
//! freshcart orders cancel 17
//! ```
//!
//! Configuration comes from the environment; see `freshcart_client::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use freshcart_client::ClientConfig;
use freshcart_core::OrderStatus;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CommandError, Context};

#[derive(Parser)]
#[command(name = "freshcart")]
#[command(author, version, about = "FreshCart grocery storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "FRESHCART_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "FRESHCART_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Send a password reset code by email
    Otp {
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password with an emailed code
    ResetPassword {
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        otp: String,
        #[arg(short, long, env = "FRESHCART_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Update profile fields
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// Birthday as YYYY-MM-DD
        #[arg(long)]
        birthday: Option<String>,
        /// Upload an image file as the new avatar
        #[arg(long)]
        avatar: Option<std::path::PathBuf>,
    },
    /// List product categories
    Categories,
    /// List products of a category
    Products {
        #[arg(short, long)]
        category: i64,
    },
    /// Show one product with its stock
    Product { id: i64 },
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favourites
    Fav {
        #[command(subcommand)]
        action: FavAction,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Place an order for cart lines
    Checkout {
        /// Cart line to order (repeatable); all lines when omitted
        #[arg(short, long = "line")]
        lines: Vec<i64>,
        #[arg(long)]
        promo: Option<String>,
        /// Recipient name (defaults to the profile)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// Pay online instead of cash on delivery
        #[arg(long)]
        online: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and the total
    List,
    /// Add units of a product
    Add {
        product: i64,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove cart lines
    Remove {
        #[arg(required = true)]
        lines: Vec<i64>,
    },
    /// Check a new quantity for a line against stock
    SetQty { line: i64, quantity: u32 },
}

#[derive(Subcommand)]
enum FavAction {
    List,
    Add { product: i64 },
    Remove {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Toggle { product: i64 },
    /// Add favourites to the cart (all when no product is given)
    ToCart { products: Vec<i64> },
}

#[derive(Subcommand)]
enum OrdersAction {
    List {
        #[arg(short, long)]
        status: Option<StatusArg>,
    },
    Details { order: i64 },
    Cancel { order: i64 },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Preparing,
    Shipped,
    Delivered,
    Canceled,
}

impl From<StatusArg> for OrderStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Preparing => Self::Preparing,
            StatusArg::Shipped => Self::Shipped,
            StatusArg::Delivered => Self::Delivered,
            StatusArg::Canceled => Self::Canceled,
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
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
        .unwrap_or_else(|_| "freshcart_client=info,freshcart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        if e.is_unexpected() {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Command failed");
        } else {
            tracing::error!(error = %e, "Command failed");
        }
        tracing::error!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CommandError> {
    let ctx = Context::new(&config).await?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&ctx, &email, password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::account::register(&ctx, &name, &email, password).await?,
        Commands::Logout => commands::account::logout(&ctx).await?,
        Commands::Whoami => commands::account::whoami(&ctx).await?,
        Commands::Otp { email } => commands::account::send_otp(&ctx, &email).await?,
        Commands::ResetPassword {
            email,
            otp,
            password,
        } => commands::account::reset_password(&ctx, &email, otp, password).await?,
        Commands::Profile {
            name,
            phone,
            address,
            birthday,
            avatar,
        } => {
            let changes = commands::account::ProfileChanges {
                name,
                phone,
                address,
                birthday,
            };
            commands::account::update_profile(&ctx, changes, avatar.as_deref()).await?;
        }
        Commands::Categories => commands::catalog::categories(&ctx).await?,
        Commands::Products { category } => commands::catalog::products(&ctx, category).await?,
        Commands::Product { id } => commands::catalog::product(&ctx, id).await?,
        Commands::Cart { action } => match action {
            CartAction::List => commands::cart::list(&ctx).await?,
            CartAction::Add { product, quantity } => {
                commands::cart::add(&ctx, product, quantity).await?;
            }
            CartAction::Remove { lines } => commands::cart::remove(&ctx, &lines).await?,
            CartAction::SetQty { line, quantity } => {
                commands::cart::set_quantity(&ctx, line, quantity).await?;
            }
        },
        Commands::Fav { action } => match action {
            FavAction::List => commands::favourites::list(&ctx).await?,
            FavAction::Add { product } => commands::favourites::add(&ctx, product).await?,
            FavAction::Remove { ids } => commands::favourites::remove(&ctx, &ids).await?,
            FavAction::Toggle { product } => commands::favourites::toggle(&ctx, product).await?,
            FavAction::ToCart { products } => {
                commands::favourites::to_cart(&ctx, &products).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { status } => {
                commands::orders::list(&ctx, status.map(OrderStatus::from)).await?;
            }
            OrdersAction::Details { order } => commands::orders::details(&ctx, order).await?,
            OrdersAction::Cancel { order } => commands::orders::cancel(&ctx, order).await?,
        },
        Commands::Checkout {
            lines,
            promo,
            name,
            phone,
            address,
            online,
        } => {
            let request = commands::checkout::CheckoutRequest {
                lines,
                promo,
                name,
                phone,
                address,
                online,
            };
            commands::checkout::run(&ctx, request).await?;
        }
    }
    Ok(())
}
