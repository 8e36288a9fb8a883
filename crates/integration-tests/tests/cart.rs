//! Cart behaviour across the cart state, stock cache and backend.

#![allow(clippy::unwrap_used)]

use freshcart_client::{ApiError, CartError, CommerceApi};
use freshcart_integration_tests::{APPLES, BANANAS, MILK, Shop};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_adding_twice_accumulates() {
    let shop = Shop::new();
    shop.cart.add(shop.api.as_ref(), BANANAS, 2).await.unwrap();
    shop.cart.add(shop.api.as_ref(), BANANAS, 3).await.unwrap();

    let lines = shop.cart.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity.get(), 5);
    assert_eq!(lines[0].subtitle, "5 items");
}

#[tokio::test]
async fn test_add_over_stock_is_rejected_by_server() {
    let shop = Shop::new();
    let err = shop.cart.add(shop.api.as_ref(), BANANAS, 11).await.unwrap_err();
    assert!(matches!(err, CartError::Api(ApiError::Rejected { status: 400, .. })));
    assert_eq!(err.user_message(), "Not enough stock");
    assert!(shop.cart.is_empty());
}

#[tokio::test]
async fn test_stock_lookup_is_cached() {
    let shop = Shop::new();
    shop.cart.add(shop.api.as_ref(), APPLES, 1).await.unwrap();
    let line = shop.cart.line_for_product(APPLES).unwrap();

    assert_eq!(shop.stock.get_stock(shop.api.as_ref(), APPLES).await, 50);
    assert_eq!(shop.stock.get_stock(shop.api.as_ref(), APPLES).await, 50);
    assert_eq!(shop.api.stock_lookups(), 1);

    shop.cart
        .mutate_quantity(line.id, 4, &shop.stock, shop.api.as_ref())
        .await
        .unwrap();
    assert_eq!(shop.api.stock_lookups(), 1);
    // A successful edit drops the entry so the next check is fresh.
    assert_eq!(shop.stock.cached(APPLES).await, None);
}

#[tokio::test]
async fn test_quantity_edit_updates_totals() {
    let shop = Shop::new();
    shop.cart.add(shop.api.as_ref(), MILK, 1).await.unwrap();
    let line = shop.cart.line_for_product(MILK).unwrap();
    let mut updates = shop.cart.subscribe();

    let edited = shop
        .cart
        .mutate_quantity(line.id, 3, &shop.stock, shop.api.as_ref())
        .await
        .unwrap();
    assert_eq!(edited.subtitle, "3 items");
    assert_eq!(edited.line_total().amount(), dec!(4.50));
    assert!(updates.has_changed().unwrap());

    let currency = shop.api.currency();
    assert_eq!(shop.cart.total(currency).unwrap().amount(), dec!(4.50));
}

#[tokio::test]
async fn test_quantity_zero_is_rejected_locally() {
    let shop = Shop::new();
    shop.cart.add(shop.api.as_ref(), MILK, 2).await.unwrap();
    let line = shop.cart.line_for_product(MILK).unwrap();

    let err = shop
        .cart
        .mutate_quantity(line.id, 0, &shop.stock, shop.api.as_ref())
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::QuantityBelowOne));
    assert_eq!(shop.api.stock_lookups(), 0);
}

#[tokio::test]
async fn test_bulk_remove_reports_each_line() {
    let shop = Shop::new();
    shop.cart.add(shop.api.as_ref(), BANANAS, 1).await.unwrap();
    shop.cart.add(shop.api.as_ref(), MILK, 1).await.unwrap();
    shop.cart.add(shop.api.as_ref(), APPLES, 1).await.unwrap();
    let ids: Vec<_> = shop.cart.lines().iter().map(|l| l.id).collect();
    shop.api.fail_removal_of(ids[1]);

    let report = shop.cart.remove_many(shop.api.as_ref(), ids.clone()).await;
    assert_eq!(report.succeeded, vec![ids[0], ids[2]]);
    assert_eq!(report.failed_ids().collect::<Vec<_>>(), vec![ids[1]]);
    assert_eq!(shop.cart.lines().len(), 1);
    assert_eq!(shop.api.cart_snapshot().len(), 1);
}
