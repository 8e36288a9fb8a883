//! Favourites: toggling, bulk removal and moving items into the cart.

use std::num::NonZeroU32;

use freshcart_core::{FavouriteId, FavouriteItem, ProductId};
use tracing::{info, instrument, warn};

use crate::api::{ApiError, CommerceApi};
use crate::cart::CartState;
use crate::report::BatchReport;

/// What [`toggle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavouriteToggle {
    Added(FavouriteItem),
    Removed(FavouriteId),
}

/// Favourite `product` if it is not yet a favourite, otherwise remove it.
///
/// # Errors
///
/// Returns the API error of the lookup or the change.
#[instrument(skip(api), fields(product_id = %product))]
pub async fn toggle(api: &dyn CommerceApi, product: ProductId) -> Result<FavouriteToggle, ApiError> {
    if !api.is_favourite(product).await? {
        let item = api.add_favourite(product).await?;
        info!(favourite_id = %item.id, "Favourite added");
        return Ok(FavouriteToggle::Added(item));
    }

    let existing = api
        .favourites()
        .await?
        .into_iter()
        .find(|f| f.product_id == product)
        .ok_or_else(|| ApiError::NotFound("Favourite not found".to_string()))?;
    api.remove_favourite(existing.id).await?;
    info!(favourite_id = %existing.id, "Favourite removed");
    Ok(FavouriteToggle::Removed(existing.id))
}

/// Remove several favourites concurrently.
pub async fn remove_many<I>(api: &dyn CommerceApi, ids: I) -> BatchReport<FavouriteId>
where
    I: IntoIterator<Item = FavouriteId>,
{
    BatchReport::collect(ids, move |id| api.remove_favourite(id))
        .await
        .with_action("removed")
}

/// Add one unit of each favourite's product to the cart, then refresh the
/// cart once. Favourites are kept.
#[instrument(skip_all)]
pub async fn move_to_cart(
    api: &dyn CommerceApi,
    cart: &CartState,
    items: &[FavouriteItem],
) -> BatchReport<ProductId> {
    let products = items.iter().map(|f| f.product_id);
    let report = BatchReport::collect(products, move |product| {
        api.add_to_cart(product, NonZeroU32::MIN)
    })
    .await
    .with_action("added to the cart");

    if !report.succeeded.is_empty()
        && let Err(e) = cart.refresh(api).await
    {
        warn!(error = %e, "Cart refresh after moving favourites failed");
    }
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::testing::InMemoryCommerce;

    const BANANAS: ProductId = ProductId::new(5);
    const MILK: ProductId = ProductId::new(6);

    fn backend() -> InMemoryCommerce {
        InMemoryCommerce::new()
            .with_product(BANANAS, "Bananas", dec!(4.99), 10)
            .with_product(MILK, "Milk", dec!(1.50), 20)
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let api = backend();

        let added = toggle(&api, BANANAS).await.unwrap();
        let FavouriteToggle::Added(item) = added else {
            panic!("expected Added, got {added:?}");
        };
        assert_eq!(item.title.as_deref(), Some("Bananas"));
        assert_eq!(api.favourites_snapshot().len(), 1);

        let removed = toggle(&api, BANANAS).await.unwrap();
        assert_eq!(removed, FavouriteToggle::Removed(item.id));
        assert!(api.favourites_snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_remove_many_reports_failures() {
        let api = backend();
        let bananas = api.seed_favourite(BANANAS);
        let milk = api.seed_favourite(MILK);
        api.fail_favourite_removal_of(milk);

        let report = remove_many(&api, [bananas, milk]).await;
        assert_eq!(report.succeeded, vec![bananas]);
        assert_eq!(report.failed_ids().collect::<Vec<_>>(), vec![milk]);
        assert_eq!(api.favourites_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_move_to_cart_adds_one_each() {
        let api = backend();
        api.seed_favourite(BANANAS);
        api.seed_favourite(MILK);
        api.seed_cart_line(BANANAS, 2);
        let items = api.favourites_snapshot();
        let cart = CartState::new();

        let report = move_to_cart(&api, &cart, &items).await;
        assert!(report.is_complete());
        assert_eq!(cart.line_for_product(BANANAS).unwrap().quantity.get(), 3);
        assert_eq!(cart.line_for_product(MILK).unwrap().quantity.get(), 1);
        assert_eq!(api.favourites_snapshot().len(), 2);
        assert_eq!(api.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_move_to_cart_partial_failure() {
        let api = backend();
        api.seed_favourite(BANANAS);
        api.seed_favourite(MILK);
        api.fail_add_of(MILK);
        let items = api.favourites_snapshot();
        let cart = CartState::new();

        let report = move_to_cart(&api, &cart, &items).await;
        assert_eq!(report.succeeded, vec![BANANAS]);
        assert_eq!(report.failed_ids().collect::<Vec<_>>(), vec![MILK]);
        assert!(cart.line_for_product(MILK).is_none());
        assert!(report.user_message().is_some());
    }
}
