//! FreshCart Core - Shared domain types.
//!
//! This crate provides the types used across all FreshCart components:
//! - `client` - HTTP clients, cart state and the checkout workflow
//! - `cli` - Command-line host for the client library
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O and no HTTP
//! clients. The remote commerce API is the source of truth for every entity
//! here; these types are the client's typed projection of it.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, statuses, emails and recipients
//! - [`models`] - Cart lines, orders, discounts, favourites, catalog and accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
