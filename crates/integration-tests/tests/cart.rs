//! Cart actions over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use std::sync::Arc;

use emporium_core::Role;
use emporium_integration_tests::TestApp;
use emporium_storefront::db::Stores;
use emporium_storefront::db::testing::UnavailableCarts;

#[tokio::test]
async fn test_signed_out_cart_actions_are_rejected() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "10.00", 5).await;
    let mut browser = app.client();

    let response = browser
        .post_json("/cart/add", &json!({ "product_id": lamp.id, "quantity": 1 }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["success"], false);
    assert!(response.header("HX-Trigger").is_none());

    let response = browser.get("/cart/count").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["count"], 0);

    let response = browser.get("/cart").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/auth/login"));
}

#[tokio::test]
async fn test_cart_walkthrough() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "10.00", 5).await;
    let (mut browser, _) = app.signed_in("shopper@example.com", Role::Customer).await;

    let response = browser
        .post_json("/cart/add", &json!({ "product_id": lamp.id, "quantity": 2 }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["success"], true);
    assert_eq!(response.header("HX-Trigger"), Some("cart-updated"));

    let contents = browser.get("/cart/contents").await.json();
    assert_eq!(contents["total_items"], 2);
    assert_eq!(contents["total_price"], "$20.00");

    browser
        .post_json("/cart/add", &json!({ "product_id": lamp.id }))
        .await;
    let contents = browser.get("/cart/contents").await.json();
    assert_eq!(contents["total_items"], 3);
    assert_eq!(contents["total_price"], "$30.00");
    assert_eq!(contents["items"].as_array().unwrap().len(), 1);
    assert_eq!(contents["items"][0]["line_total"], "$30.00");
    assert_eq!(browser.get("/cart/count").await.json()["count"], 3);

    let response = browser
        .post_json("/cart/update", &json!({ "product_id": lamp.id, "quantity": 0 }))
        .await;
    assert_eq!(response.json()["success"], true);

    let contents = browser.get("/cart/contents").await.json();
    assert_eq!(contents["total_items"], 0);
    assert_eq!(contents["total_price"], "$0.00");

    // Carts never reserve stock
    assert_eq!(app.inventory(lamp.id).await, 5);
}

#[tokio::test]
async fn test_insufficient_stock_is_a_failed_action() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "10.00", 5).await;
    let (mut browser, _) = app.signed_in("shopper@example.com", Role::Customer).await;

    browser
        .post_json("/cart/add", &json!({ "product_id": lamp.id, "quantity": 2 }))
        .await;
    let response = browser
        .post_json("/cart/add", &json!({ "product_id": lamp.id, "quantity": 6 }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Not enough inventory")
    );
    assert!(response.header("HX-Trigger").is_none());
    assert_eq!(browser.get("/cart/count").await.json()["count"], 2);
}

#[tokio::test]
async fn test_unknown_product_and_bad_quantity() {
    let app = TestApp::new();
    let (mut browser, _) = app.signed_in("shopper@example.com", Role::Customer).await;

    let body = browser
        .post_json("/cart/add", &json!({ "product_id": 4242, "quantity": 1 }))
        .await
        .json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Product not found");

    let lamp = app.product("Desk Lamp", "10.00", 5).await;
    let body = browser
        .post_json("/cart/add", &json!({ "product_id": lamp.id, "quantity": 0 }))
        .await
        .json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Quantity must be at least 1");
}

#[tokio::test]
async fn test_remove_and_clear() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "10.00", 5).await;
    let mug = app.product("Enamel Mug", "4.50", 20).await;
    let (mut browser, _) = app.signed_in("shopper@example.com", Role::Customer).await;

    for (product, quantity) in [(lamp.id, 1), (mug.id, 4)] {
        browser
            .post_json("/cart/add", &json!({ "product_id": product, "quantity": quantity }))
            .await;
    }
    assert_eq!(browser.get("/cart/contents").await.json()["total_price"], "$28.00");

    let response = browser
        .post_json("/cart/remove", &json!({ "product_id": lamp.id }))
        .await;
    assert_eq!(response.json()["success"], true);
    assert_eq!(browser.get("/cart/count").await.json()["count"], 4);

    let response = browser.post_json("/cart/clear", &json!({})).await;
    assert_eq!(response.json()["success"], true);
    assert_eq!(response.header("HX-Trigger"), Some("cart-updated"));
    let contents = browser.get("/cart/contents").await.json();
    assert_eq!(contents["total_items"], 0);
    assert!(contents["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "10.00", 5).await;
    let (mut alice, _) = app.signed_in("alice@example.com", Role::Customer).await;
    let (mut bob, _) = app.signed_in("bob@example.com", Role::Customer).await;

    alice
        .post_json("/cart/add", &json!({ "product_id": lamp.id, "quantity": 2 }))
        .await;

    assert_eq!(alice.get("/cart/count").await.json()["count"], 2);
    assert_eq!(bob.get("/cart/count").await.json()["count"], 0);
}

#[tokio::test]
async fn test_cart_page_renders_lines() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "10.00", 5).await;
    let (mut browser, _) = app.signed_in("shopper@example.com", Role::Customer).await;
    browser
        .post_json("/cart/add", &json!({ "product_id": lamp.id, "quantity": 2 }))
        .await;

    let page = browser.get("/cart").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Desk Lamp"));
    assert!(page.body.contains("$20.00"));
}

#[tokio::test]
async fn test_cart_contents_when_store_is_down() {
    let mut stores = Stores::memory();
    stores.carts = Arc::new(UnavailableCarts);
    let app = TestApp::with_stores(stores);
    let (mut browser, _) = app.signed_in("shopper@example.com", Role::Customer).await;

    let response = browser.get("/cart/contents").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to load cart");
    assert_eq!(body["total_items"], 0);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    let response = browser.get("/cart/count").await;
    assert_eq!(response.json()["count"], 0);
}
