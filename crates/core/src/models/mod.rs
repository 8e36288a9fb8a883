//! Domain entities.
//!
//! The remote commerce API is authoritative for all of these; the client
//! holds a possibly-stale projection.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod discount;
pub mod favourite;
pub mod order;

pub use account::{Account, AccountUpdate, Gender};
pub use cart::CartLine;
pub use catalog::{Category, Product};
pub use discount::Discount;
pub use favourite::FavouriteItem;
pub use order::{Order, OrderDetail, OrderDetailDraft, OrderDraft, OrderDraftError};
