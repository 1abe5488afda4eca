//! Cart and order workflows end to end over the in-memory store.

#![allow(clippy::unwrap_used)]

use cartwright_api::db::{CommerceStore, MemoryStore};
use cartwright_api::models::OrderPatch;
use cartwright_api::services::{EngineError, LineRequest};
use cartwright_core::{OrderStatus, PaymentStatus, Price, UserId};
use cartwright_integration_tests::{Engine, shipping};

#[tokio::test]
async fn cart_reservation_then_independent_order() {
    let store = MemoryStore::new();
    let lamp = store.insert_product("Lamp", Price::from_cents(2500), 10).await;
    let user = UserId::new(7);
    let address = store.insert_address(user, shipping("Rosa")).await;
    let engine = Engine::memory(&store);

    engine.cart.create_cart(user);
    let line = engine.cart.add_item(user, lamp.id, 3).await.unwrap();
    assert_eq!(line.quantity.get(), 3);

    let after_cart = store.product(lamp.id).await.unwrap().unwrap();
    assert_eq!(after_cart.stock, 7);
    assert_eq!(after_cart.version, 1);

    let lines = [LineRequest {
        product_id: lamp.id,
        quantity: 3,
    }];
    let placed = engine.orders.create_order(user, address, &lines).await.unwrap();
    assert_eq!(placed.amount, Price::from_cents(7500));

    let after_order = store.product(lamp.id).await.unwrap().unwrap();
    assert_eq!(after_order.stock, 4);
    assert_eq!(after_order.version, 2);

    // The order does not consume the cart.
    assert_eq!(engine.cart.get_cart(user).await.unwrap().len(), 1);

    let details = engine.orders.get_order(user, placed.order_id).await.unwrap();
    assert_eq!(details.order.status, OrderStatus::Pending);
    assert_eq!(details.order.shipping.first_name, "Rosa");
    assert_eq!(details.lines.len(), 1);
    assert_eq!(details.lines.first().unwrap().cost, Price::from_cents(2500));

    let payment = details.payment.unwrap();
    assert_eq!(payment.transaction_id, placed.transaction_id);
    assert_eq!(payment.amount, Price::from_cents(7500));
    assert_eq!(payment.status, PaymentStatus::Unpaid);
}

#[tokio::test]
async fn emptying_the_cart_keeps_reserved_stock() {
    let store = MemoryStore::new();
    let mug = store.insert_product("Mug", Price::from_cents(900), 5).await;
    let user = UserId::new(3);
    let engine = Engine::memory(&store);

    engine.cart.add_item(user, mug.id, 2).await.unwrap();
    assert_eq!(engine.cart.empty_cart(user).await.unwrap(), 1);
    assert!(engine.cart.get_cart(user).await.unwrap().is_empty());

    let mug = store.product(mug.id).await.unwrap().unwrap();
    assert_eq!(mug.stock, 3);
}

#[tokio::test]
async fn failed_order_leaves_no_trace() {
    let store = MemoryStore::new();
    let pen = store.insert_product("Pen", Price::from_cents(300), 5).await;
    let ink = store.insert_product("Ink", Price::from_cents(700), 1).await;
    let user = UserId::new(11);
    let address = store.insert_address(user, shipping("Ines")).await;
    let engine = Engine::memory(&store);

    let lines = [
        LineRequest {
            product_id: pen.id,
            quantity: 2,
        },
        LineRequest {
            product_id: ink.id,
            quantity: 2,
        },
    ];
    let err = engine.orders.checkout(user, address, &lines).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientStock { product_id, requested: 2, available: 1, .. }
            if product_id == ink.id
    ));

    assert_eq!(store.product(pen.id).await.unwrap().unwrap().stock, 5);
    assert_eq!(store.product(ink.id).await.unwrap().unwrap().stock, 1);
    assert!(store.all_orders().await.is_empty());
    assert!(store.all_payments().await.is_empty());
    assert_eq!(store.order_line_count().await, 0);
}

#[tokio::test]
async fn order_fields_and_status_can_be_updated_by_owner() {
    let store = MemoryStore::new();
    let tea = store.insert_product("Tea", Price::from_cents(450), 8).await;
    let user = UserId::new(5);
    let address = store.insert_address(user, shipping("Omar")).await;
    let engine = Engine::memory(&store);

    let lines = [LineRequest {
        product_id: tea.id,
        quantity: 1,
    }];
    let placed = engine.orders.checkout(user, address, &lines).await.unwrap();

    let patch = OrderPatch {
        street_address: Some("2 New Street".to_string()),
        status: Some(OrderStatus::Paid),
        ..OrderPatch::default()
    };
    let order = engine
        .orders
        .update_order(user, placed.order_id, patch)
        .await
        .unwrap();
    assert_eq!(order.shipping.street_address, "2 New Street");
    assert_eq!(order.status, OrderStatus::Paid);

    let stranger = engine
        .orders
        .update_order(UserId::new(6), placed.order_id, OrderPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(stranger, EngineError::NotFound(_)));

    let reopen = OrderPatch {
        status: Some(OrderStatus::Pending),
        ..OrderPatch::default()
    };
    let err = engine
        .orders
        .update_order(user, placed.order_id, reopen)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn catalog_sees_stock_after_commit() {
    let store = MemoryStore::new();
    let jar = store.insert_product("Jar", Price::from_cents(650), 4).await;
    let user = UserId::new(2);
    let engine = Engine::memory(&store);

    assert_eq!(engine.catalog.product(jar.id).await.unwrap().stock, 4);
    engine.cart.add_item(user, jar.id, 4).await.unwrap();
    assert_eq!(engine.catalog.product(jar.id).await.unwrap().stock, 0);
}
