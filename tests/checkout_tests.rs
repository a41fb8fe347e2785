mod common;

use rust_decimal_macros::dec;
use storefront::domain::ids::{ProductId, SkuId, UserId};
use storefront::domain::order::OrderStatus;
use storefront::error::StoreError;

#[tokio::test]
async fn test_two_line_checkout_scenario() {
    let stores = common::stores();
    let storefront = common::storefront(&stores);
    common::seed(&storefront, &[(1, dec!(10.00), 5), (2, dec!(5.00), 3)]).await;

    let user = UserId(1);
    let cart = storefront.carts.find_or_create(user).await.unwrap();
    storefront.carts.add_line(cart.id, SkuId(1), 2).await.unwrap();
    storefront.carts.add_line(cart.id, SkuId(2), 1).await.unwrap();

    let order = storefront.checkout.checkout(user, cart.id).await.unwrap();

    assert_eq!(order.total_price.to_string(), "25.00");
    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.status, OrderStatus::NotPaid);
    assert_eq!(storefront.catalog.sku(SkuId(1)).await.unwrap().available, 3);
    assert_eq!(storefront.catalog.sku(SkuId(2)).await.unwrap().available, 2);
    assert!(storefront.carts.find_or_create(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_line_changes_nothing() {
    let stores = common::stores();
    let storefront = common::storefront(&stores);
    common::seed(&storefront, &[(1, dec!(10.00), 5), (2, dec!(5.00), 1)]).await;

    let user = UserId(1);
    let cart = storefront.carts.find_or_create(user).await.unwrap();
    storefront.carts.add_line(cart.id, SkuId(1), 5).await.unwrap();
    storefront.carts.add_line(cart.id, SkuId(2), 2).await.unwrap();

    let result = storefront.checkout.checkout(user, cart.id).await;
    assert!(matches!(
        result,
        Err(StoreError::InsufficientStock {
            sku: SkuId(2),
            requested: 2,
            available: 1
        })
    ));

    assert_eq!(storefront.catalog.sku(SkuId(1)).await.unwrap().available, 5);
    assert_eq!(storefront.catalog.sku(SkuId(2)).await.unwrap().available, 1);
    assert!(storefront.orders.orders_for_user(user).await.unwrap().is_empty());
    let cart = storefront.carts.find_or_create(user).await.unwrap();
    assert_eq!(cart.lines.len(), 2);
}

#[tokio::test]
async fn test_merged_lines_count_against_stock() {
    let stores = common::stores();
    let storefront = common::storefront(&stores);
    common::seed(&storefront, &[(1, dec!(3.00), 4)]).await;

    let user = UserId(7);
    let cart = storefront.carts.find_or_create(user).await.unwrap();
    storefront.carts.add_line(cart.id, SkuId(1), 2).await.unwrap();
    storefront.carts.add_line(cart.id, SkuId(1), 3).await.unwrap();

    let cart = storefront.carts.find_or_create(user).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity.get(), 5);

    assert!(matches!(
        storefront.checkout.checkout(user, cart.id).await,
        Err(StoreError::InsufficientStock { requested: 5, .. })
    ));
}

#[tokio::test]
async fn test_order_lines_survive_repricing() {
    let stores = common::stores();
    let storefront = common::storefront(&stores);
    common::seed(&storefront, &[(1, dec!(10.00), 5)]).await;

    let user = UserId(1);
    let cart = storefront.carts.find_or_create(user).await.unwrap();
    storefront.carts.add_line(cart.id, SkuId(1), 2).await.unwrap();
    let order = storefront.checkout.checkout(user, cart.id).await.unwrap();

    storefront.catalog.reprice(SkuId(1), dec!(99.99)).await.unwrap();

    let fetched = storefront.orders.order(user, order.id).await.unwrap();
    assert_eq!(fetched.lines, order.lines);
    assert_eq!(fetched.lines[0].unit_price.to_string(), "10.00");
    assert_eq!(fetched.total_price.to_string(), "20.00");
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let stores = common::stores();
    let storefront = common::storefront(&stores);
    let user = UserId(1);
    let cart = storefront.carts.find_or_create(user).await.unwrap();

    assert!(matches!(
        storefront.checkout.checkout(user, cart.id).await,
        Err(StoreError::CartEmpty(id)) if id == cart.id
    ));
}

#[tokio::test]
async fn test_wishlist_add_is_idempotent() {
    let stores = common::stores();
    let storefront = common::storefront(&stores);
    common::seed(&storefront, &[]).await;

    let user = UserId(2);
    storefront.wishlists.add(user, ProductId(1)).await.unwrap();
    storefront.wishlists.add(user, ProductId(1)).await.unwrap();

    let wishlist = storefront.wishlists.find_or_create(user).await.unwrap();
    assert_eq!(wishlist.products, vec![ProductId(1)]);
    let products = storefront.wishlists.products(user).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Runner");
}

#[tokio::test]
async fn test_cancel_keeps_stock_taken() {
    let stores = common::stores();
    let storefront = common::storefront(&stores);
    common::seed(&storefront, &[(1, dec!(1.00), 2)]).await;

    let user = UserId(1);
    let cart = storefront.carts.find_or_create(user).await.unwrap();
    storefront.carts.add_line(cart.id, SkuId(1), 2).await.unwrap();
    let order = storefront.checkout.checkout(user, cart.id).await.unwrap();

    let canceled = storefront.orders.cancel(user, order.id).await.unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert_eq!(storefront.catalog.sku(SkuId(1)).await.unwrap().available, 0);
}
