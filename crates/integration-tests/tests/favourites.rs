//! Favourites flowing into the cart.

#![allow(clippy::unwrap_used)]

use freshcart_client::favourites::{self, FavouriteToggle};
use freshcart_integration_tests::{APPLES, BANANAS, MILK, Shop};

#[tokio::test]
async fn test_toggle_then_move_to_cart() {
    let shop = Shop::new();
    for product in [BANANAS, MILK, APPLES] {
        let toggled = favourites::toggle(shop.api.as_ref(), product).await.unwrap();
        assert!(matches!(toggled, FavouriteToggle::Added(_)));
    }
    let toggled = favourites::toggle(shop.api.as_ref(), APPLES).await.unwrap();
    assert!(matches!(toggled, FavouriteToggle::Removed(_)));

    let items = shop.api.favourites_snapshot();
    assert_eq!(items.len(), 2);

    let report = favourites::move_to_cart(shop.api.as_ref(), &shop.cart, &items).await;
    assert!(report.is_complete());
    assert_eq!(shop.cart.lines().len(), 2);
    assert!(shop.cart.line_for_product(APPLES).is_none());
}
