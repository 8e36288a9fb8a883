//! FreshCart client library.
//!
//! Everything a storefront front-end needs between its screens and the
//! remote commerce API:
//!
//! - [`session`] - Persisted bearer token and re-login signal
//! - [`api`] - HTTP clients for auth, catalog, cart, favourites and orders
//! - [`stock`] - Per-product stock cache
//! - [`cart`] - Shared cart state with stock-checked quantity edits
//! - [`checkout`] - Order submission workflow
//! - [`orders`] - Order history tabs and cancellation
//! - [`favourites`] - Favourite toggling and bulk actions
//!
//! The remote API is the source of truth. Cart, checkout, order and
//! favourite logic talks to it through the [`CommerceApi`] trait, so it can
//! run against the in-memory backend in `testing` as well as the HTTP
//! [`CommerceClient`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod favourites;
pub mod orders;
pub mod report;
pub mod session;
pub mod stock;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{ApiError, CommerceApi, CommerceClient};
pub use cart::{CartError, CartState, RemovalReport};
pub use checkout::{
    CheckoutError, CheckoutOutcome, CheckoutState, CheckoutSummary, CheckoutWorkflow,
    CleanupReport,
};
pub use config::{ApiConfig, ClientConfig, ConfigError, StockConfig};
pub use error::{Error, Result};
pub use favourites::FavouriteToggle;
pub use orders::{OrderError, OrderHistory, OrderTab};
pub use report::BatchReport;
pub use session::{SessionError, SessionStore};
pub use stock::StockCache;
