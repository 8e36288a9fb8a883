//! Product catalog: categories and products.

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Money, ProductId};

/// A product category (fruit, dairy, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub unit: String,
    pub image: Option<String>,
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Category name as reported by the server.
    pub category: String,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub image: Option<String>,
    /// Units currently in stock.
    pub stock: u32,
    pub unit: String,
}

impl Product {
    /// Whether at least `quantity` units are available.
    #[must_use]
    pub const fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}
