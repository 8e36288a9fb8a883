//! Shared client-side cart state.
//!
//! Every screen holds a clone of the same [`CartState`] and observes it
//! through [`CartState::subscribe`]. The server stays authoritative:
//! additions and removals go to the server first, and [`CartState::refresh`]
//! replaces the local view with the server's.
//!
//! Quantity edits are local only. They are checked against the stock cache
//! and never sent to the server; checkout re-validates stock before any
//! order is placed.

use std::num::NonZeroU32;
use std::sync::Arc;

use freshcart_core::{CartLine, CartLineId, Money, ProductId};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, CommerceApi};
use crate::report::BatchReport;
use crate::stock::StockCache;

/// Per-line result of a bulk removal.
pub type RemovalReport = BatchReport<CartLineId>;

/// Cart operation errors.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Quantity must be at least 1")]
    QuantityBelowOne,

    #[error("Only {available} of {title} in stock (requested {requested})")]
    ExceedsStock {
        title: String,
        requested: u32,
        available: u32,
    },

    #[error("Cart line {0} not found")]
    LineNotFound(CartLineId),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CartError {
    /// Text suitable for an alert dialog.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ExceedsStock {
                title, available, ..
            } => format!("Only {available} of {title} left in stock."),
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Cloneable handle to the cart lines.
#[derive(Clone)]
pub struct CartState {
    lines: Arc<watch::Sender<Vec<CartLine>>>,
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartState")
            .field("lines", &self.lines.borrow().len())
            .finish()
    }
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        let (lines, _) = watch::channel(Vec::new());
        Self {
            lines: Arc::new(lines),
        }
    }

    /// Observe every change to the lines.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartLine>> {
        self.lines.subscribe()
    }

    /// Snapshot of the current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.borrow().clone()
    }

    /// One line by id.
    #[must_use]
    pub fn line(&self, id: CartLineId) -> Option<CartLine> {
        self.lines.borrow().iter().find(|l| l.id == id).cloned()
    }

    /// The line holding `product`, if any.
    #[must_use]
    pub fn line_for_product(&self, product: ProductId) -> Option<CartLine> {
        self.lines
            .borrow()
            .iter()
            .find(|l| l.product_id == product)
            .cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }

    /// Sum of all line totals, or `None` for mixed currencies.
    #[must_use]
    pub fn total(&self, currency: freshcart_core::CurrencyCode) -> Option<Money> {
        Money::sum(currency, self.lines.borrow().iter().map(CartLine::line_total)).ok()
    }

    /// Replace every line.
    pub fn replace(&self, lines: Vec<CartLine>) {
        self.lines.send_replace(lines);
    }

    /// Drop lines locally without contacting the server.
    pub fn forget<I>(&self, ids: I)
    where
        I: IntoIterator<Item = CartLineId>,
    {
        let ids: Vec<CartLineId> = ids.into_iter().collect();
        if ids.is_empty() {
            return;
        }
        self.lines.send_modify(|lines| lines.retain(|l| !ids.contains(&l.id)));
    }

    /// Reload the lines from the server.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the cart cannot be fetched; local state is left
    /// untouched.
    #[instrument(skip_all)]
    pub async fn refresh(&self, api: &dyn CommerceApi) -> Result<(), ApiError> {
        let lines = api.fetch_cart().await?;
        info!(lines = lines.len(), "Cart refreshed");
        self.replace(lines);
        Ok(())
    }

    /// Add units of a product on the server, then refresh.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityBelowOne` for zero, or `CartError::Api`
    /// if the server call fails.
    #[instrument(skip(self, api), fields(product_id = %product))]
    pub async fn add(
        &self,
        api: &dyn CommerceApi,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        let quantity = NonZeroU32::new(quantity).ok_or(CartError::QuantityBelowOne)?;
        api.add_to_cart(product, quantity).await?;
        self.refresh(api).await?;
        Ok(())
    }

    /// Change a line's quantity locally.
    ///
    /// Rejected without any state change when `quantity` is below one or
    /// above the product's stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityBelowOne`, `CartError::ExceedsStock` or
    /// `CartError::LineNotFound`.
    #[instrument(skip(self, stock, api), fields(cart_line_id = %id))]
    pub async fn mutate_quantity(
        &self,
        id: CartLineId,
        quantity: u32,
        stock: &StockCache,
        api: &dyn CommerceApi,
    ) -> Result<CartLine, CartError> {
        let Some(quantity) = NonZeroU32::new(quantity) else {
            warn!("Rejected quantity below one");
            return Err(CartError::QuantityBelowOne);
        };
        let line = self.line(id).ok_or_else(|| {
            warn!("Rejected quantity change for unknown line");
            CartError::LineNotFound(id)
        })?;

        let available = stock.get_stock(api, line.product_id).await;
        if quantity.get() > available {
            warn!(
                product_id = %line.product_id,
                requested = quantity.get(),
                available,
                "Rejected quantity above stock"
            );
            return Err(CartError::ExceedsStock {
                title: line.title,
                requested: quantity.get(),
                available,
            });
        }

        let mut updated = None;
        self.lines.send_modify(|lines| {
            if let Some(existing) = lines.iter_mut().find(|l| l.id == id) {
                *existing = existing.with_quantity(quantity);
                existing.subtitle = format!("{quantity} items");
                updated = Some(existing.clone());
            }
        });
        // Removed by another task while stock was being checked.
        let updated = updated.ok_or(CartError::LineNotFound(id))?;

        stock.invalidate(updated.product_id).await;
        Ok(updated)
    }

    /// Delete a line on the server, then locally.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the server refuses; the line stays.
    #[instrument(skip(self, api), fields(cart_line_id = %id))]
    pub async fn remove(&self, api: &dyn CommerceApi, id: CartLineId) -> Result<(), ApiError> {
        api.remove_from_cart(id).await?;
        self.forget([id]);
        info!("Removed from cart");
        Ok(())
    }

    /// Delete several lines concurrently. Confirmed deletions are removed
    /// locally; failed ones stay and are listed in the report.
    #[instrument(skip_all)]
    pub async fn remove_many<I>(&self, api: &dyn CommerceApi, ids: I) -> RemovalReport
    where
        I: IntoIterator<Item = CartLineId>,
    {
        let report = BatchReport::collect(ids, move |id| api.remove_from_cart(id))
            .await
            .with_action("removed");

        self.forget(report.succeeded.iter().copied());
        if !report.is_complete() {
            warn!(failed = report.failed.len(), "Some cart lines could not be removed");
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::testing::InMemoryCommerce;

    const BANANAS: ProductId = ProductId::new(5);
    const MILK: ProductId = ProductId::new(6);

    async fn setup(stock: u32, quantity: u32) -> (InMemoryCommerce, CartState, CartLineId) {
        let api = InMemoryCommerce::new()
            .with_product(BANANAS, "Bananas", dec!(4.99), stock)
            .with_product(MILK, "Milk", dec!(1.50), 20);
        let line = api.seed_cart_line(BANANAS, quantity);
        let cart = CartState::new();
        cart.refresh(&api).await.unwrap();
        (api, cart, line)
    }

    #[tokio::test]
    async fn test_add_accumulates_on_server() {
        let (api, cart, line) = setup(10, 2).await;
        cart.add(&api, BANANAS, 3).await.unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(line).unwrap().quantity.get(), 5);
    }

    #[tokio::test]
    async fn test_add_zero_is_rejected_without_request() {
        let (api, cart, _) = setup(10, 2).await;
        let err = cart.add(&api, MILK, 0).await.unwrap_err();
        assert!(matches!(err, CartError::QuantityBelowOne));
        assert_eq!(api.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_mutate_within_stock() {
        let (api, cart, line) = setup(10, 2).await;
        let stock = StockCache::default();
        let updated = cart.mutate_quantity(line, 4, &stock, &api).await.unwrap();
        assert_eq!(updated.quantity.get(), 4);
        assert_eq!(cart.line(line).unwrap().quantity.get(), 4);
        // Local only: the server still has 2.
        assert_eq!(api.cart_snapshot()[0].quantity.get(), 2);
    }

    #[tokio::test]
    async fn test_mutate_below_one_is_noop() {
        let (api, cart, line) = setup(10, 2).await;
        let stock = StockCache::default();
        let before = cart.lines();
        let err = cart.mutate_quantity(line, 0, &stock, &api).await.unwrap_err();
        assert!(matches!(err, CartError::QuantityBelowOne));
        assert_eq!(cart.lines(), before);
    }

    #[tokio::test]
    async fn test_mutate_above_stock_is_noop() {
        let (api, cart, line) = setup(1, 1).await;
        let stock = StockCache::default();
        let err = cart.mutate_quantity(line, 2, &stock, &api).await.unwrap_err();
        match err {
            CartError::ExceedsStock {
                title,
                requested,
                available,
            } => {
                assert_eq!(title, "Bananas");
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(cart.line(line).unwrap().quantity.get(), 1);
    }

    #[tokio::test]
    async fn test_mutate_unknown_line() {
        let (api, cart, _) = setup(10, 2).await;
        let stock = StockCache::default();
        let err = cart
            .mutate_quantity(CartLineId::new(999), 1, &stock, &api)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::LineNotFound(_)));
    }

    #[tokio::test]
    async fn test_mutate_invalidates_stock_entry() {
        let (api, cart, line) = setup(10, 2).await;
        let stock = StockCache::default();
        cart.mutate_quantity(line, 3, &stock, &api).await.unwrap();
        assert_eq!(stock.cached(BANANAS).await, None);
    }

    #[tokio::test]
    async fn test_remove_keeps_line_when_server_refuses() {
        let (api, cart, line) = setup(10, 2).await;
        api.fail_removal_of(line);
        assert!(cart.remove(&api, line).await.is_err());
        assert!(cart.line(line).is_some());

        api.allow_removal_of(line);
        cart.remove(&api, line).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_remove_many_reports_partial_failure() {
        let (api, cart, bananas) = setup(10, 2).await;
        let milk = api.seed_cart_line(MILK, 1);
        cart.refresh(&api).await.unwrap();
        api.fail_removal_of(milk);

        let report = cart.remove_many(&api, [bananas, milk]).await;
        assert_eq!(report.succeeded, vec![bananas]);
        assert_eq!(report.failed_ids().collect::<Vec<_>>(), vec![milk]);
        assert!(report.user_message().is_some());

        let remaining: Vec<_> = cart.lines().into_iter().map(|l| l.id).collect();
        assert_eq!(remaining, vec![milk]);
    }

    #[tokio::test]
    async fn test_subscribers_see_refresh() {
        let (api, cart, _) = setup(10, 2).await;
        let mut rx = cart.subscribe();
        api.seed_cart_line(MILK, 1);
        cart.refresh(&api).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_cart_total() {
        let (_api, cart, _) = setup(10, 2).await;
        assert_eq!(
            cart.total(freshcart_core::CurrencyCode::USD).unwrap().to_string(),
            "$9.98"
        );
    }
}
