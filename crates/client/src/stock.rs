//! Stock lookup cache.
//!
//! Stock levels are looked up once per product and reused until the entry
//! expires or is invalidated. Quantity edits and checkout invalidate the
//! products they touch, so the next check goes back to the server.

use std::time::Duration;

use freshcart_core::ProductId;
use moka::future::Cache;
use tracing::{debug, instrument, warn};

use crate::api::CommerceApi;
use crate::config::StockConfig;

/// Process-wide product → stock cache. Clones share the same entries.
#[derive(Clone)]
pub struct StockCache {
    cache: Cache<ProductId, u32>,
}

impl StockCache {
    /// Create a cache with the configured lifetime and capacity.
    #[must_use]
    pub fn new(config: StockConfig) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(config.capacity)
                .time_to_live(config.ttl)
                .build(),
        }
    }

    /// Cache whose entries live for `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(StockConfig {
            ttl,
            ..StockConfig::default()
        })
    }

    /// Units in stock for `product`.
    ///
    /// A cached value is returned without a request. On a miss one lookup is
    /// made (concurrent callers share it) and cached on success. A failed
    /// lookup caches nothing and reports 0, which blocks the action that
    /// asked.
    #[instrument(skip(self, api), fields(product_id = %product))]
    pub async fn get_stock(&self, api: &dyn CommerceApi, product: ProductId) -> u32 {
        if let Some(stock) = self.cache.get(&product).await {
            debug!(stock, "Stock cache hit");
            return stock;
        }

        match self
            .cache
            .try_get_with(product, async { api.stock(product).await })
            .await
        {
            Ok(stock) => {
                debug!(stock, "Stock looked up");
                stock
            }
            Err(e) => {
                warn!(error = %e, "Stock lookup failed, treating as out of stock");
                0
            }
        }
    }

    /// The cached value, if any. Never makes a request.
    pub async fn cached(&self, product: ProductId) -> Option<u32> {
        self.cache.get(&product).await
    }

    /// Forget one product's stock.
    pub async fn invalidate(&self, product: ProductId) {
        self.cache.invalidate(&product).await;
    }

    /// Forget several products' stock.
    pub async fn invalidate_many<I>(&self, products: I)
    where
        I: IntoIterator<Item = ProductId>,
    {
        for product in products {
            self.cache.invalidate(&product).await;
        }
    }
}

impl Default for StockCache {
    fn default() -> Self {
        Self::new(StockConfig::default())
    }
}

impl std::fmt::Debug for StockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::testing::InMemoryCommerce;

    fn product() -> ProductId {
        ProductId::new(5)
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let api = InMemoryCommerce::new().with_product(product(), "Bananas", dec!(4.99), 10);
        let stock = StockCache::default();

        assert_eq!(stock.get_stock(&api, product()).await, 10);
        assert_eq!(stock.get_stock(&api, product()).await, 10);
        assert_eq!(api.stock_lookups(), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_zero_and_not_cached() {
        let api = InMemoryCommerce::new().with_product(product(), "Bananas", dec!(4.99), 10);
        api.fail_stock_lookups(true);
        let stock = StockCache::default();

        assert_eq!(stock.get_stock(&api, product()).await, 0);
        assert_eq!(stock.cached(product()).await, None);

        api.fail_stock_lookups(false);
        assert_eq!(stock.get_stock(&api, product()).await, 10);
        assert_eq!(api.stock_lookups(), 2);
    }

    #[tokio::test]
    async fn test_unknown_product_is_out_of_stock() {
        let api = InMemoryCommerce::new();
        let stock = StockCache::default();
        assert_eq!(stock.get_stock(&api, ProductId::new(404)).await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fresh_lookup() {
        let api = InMemoryCommerce::new().with_product(product(), "Bananas", dec!(4.99), 10);
        let stock = StockCache::default();
        assert_eq!(stock.get_stock(&api, product()).await, 10);

        api.set_stock(product(), 3);
        assert_eq!(stock.get_stock(&api, product()).await, 10);

        stock.invalidate(product()).await;
        assert_eq!(stock.get_stock(&api, product()).await, 3);
        assert_eq!(api.stock_lookups(), 2);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let api = InMemoryCommerce::new().with_product(product(), "Bananas", dec!(4.99), 10);
        let stock = StockCache::with_ttl(Duration::from_millis(50));
        assert_eq!(stock.get_stock(&api, product()).await, 10);

        api.set_stock(product(), 4);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(stock.get_stock(&api, product()).await, 4);
    }
}
