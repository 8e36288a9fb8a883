//! Subcommand implementations.
//!
//! Each command builds on one shared [`Context`] and reports its result
//! through `tracing`, the same channel used for diagnostics.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod favourites;
pub mod orders;

use freshcart_client::{
    ApiError, CartError, CartState, CheckoutError, CommerceClient, ConfigError, OrderError,
    SessionError, SessionStore, StockCache,
};
use freshcart_client::{ClientConfig, Error as ClientError};
use freshcart_core::EmailError;
use thiserror::Error;

/// Errors a command can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// An argument could not be turned into a domain value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not read {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
}

impl CommandError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Client(e) => e.is_unexpected(),
            Self::InvalidArgument(_) | Self::File { .. } => false,
        }
    }
}

macro_rules! from_client_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CommandError {
                fn from(e: $source) -> Self {
                    Self::Client(ClientError::from(e))
                }
            }
        )*
    };
}

from_client_error!(ApiError, CartError, CheckoutError, ConfigError, OrderError, SessionError);

impl From<EmailError> for CommandError {
    fn from(e: EmailError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

/// Everything a command needs, built once per invocation.
pub struct Context {
    pub client: CommerceClient,
    pub session: SessionStore,
    pub stock: StockCache,
    pub cart: CartState,
}

impl Context {
    pub async fn new(config: &ClientConfig) -> Result<Self, CommandError> {
        let session = SessionStore::open(&config.session_file).await?;
        if session.mark_launched().await? {
            tracing::info!("Welcome to FreshCart");
        }
        let client = CommerceClient::new(&config.api, session.clone())?;

        Ok(Self {
            client,
            session,
            stock: StockCache::new(config.stock),
            cart: CartState::new(),
        })
    }
}
