//! Favourited products.

use serde::{Deserialize, Serialize};

use crate::types::{FavouriteId, Money, ProductId};

/// A product the shopper marked as favourite.
///
/// The server keeps at most one entry per account and product. Display
/// fields are optional because the add endpoint echoes only the ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavouriteItem {
    pub id: FavouriteId,
    pub product_id: ProductId,
    pub title: Option<String>,
    pub image: Option<String>,
    pub price: Option<Money>,
}
