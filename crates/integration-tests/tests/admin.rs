//! Role-gated admin pages.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use emporium_core::Role;
use emporium_integration_tests::TestApp;

#[tokio::test]
async fn test_user_admin_is_admin_only() {
    let app = TestApp::new();
    let (mut customer, _) = app.signed_in("shopper@example.com", Role::Customer).await;
    let (mut employee, _) = app.signed_in("clerk@example.com", Role::Employee).await;
    let (mut admin, _) = app.signed_in("admin@example.com", Role::Admin).await;

    assert_eq!(customer.get("/admin/users").await.status, StatusCode::NOT_FOUND);
    assert_eq!(employee.get("/admin/users").await.status, StatusCode::NOT_FOUND);

    let page = admin.get("/admin/users").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("shopper@example.com"));
    assert!(page.body.contains("clerk@example.com"));

    let filtered = admin.get("/admin/users?role=employee").await;
    assert!(filtered.body.contains("clerk@example.com"));
    assert!(!filtered.body.contains("shopper@example.com"));

    assert_eq!(
        app.client().get("/admin/users").await.status,
        StatusCode::SEE_OTHER
    );
}

#[tokio::test]
async fn test_product_admin_allows_staff() {
    let app = TestApp::new();
    app.product("Desk Lamp", "10.00", 5).await;
    let (mut customer, _) = app.signed_in("shopper@example.com", Role::Customer).await;
    let (mut employee, _) = app.signed_in("clerk@example.com", Role::Employee).await;

    assert_eq!(customer.get("/admin/products").await.status, StatusCode::NOT_FOUND);

    let page = employee.get("/admin/products").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("DESKLAMP"));
    assert_eq!(employee.get("/admin/products/new").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_role_change_applies_without_new_login() {
    let app = TestApp::new();
    let (mut admin, _) = app.signed_in("admin@example.com", Role::Admin).await;
    let (mut clerk, clerk_user) = app.signed_in("clerk@example.com", Role::Customer).await;
    assert_eq!(clerk.get("/admin/products").await.status, StatusCode::NOT_FOUND);

    let response = admin
        .post_form(
            &format!("/admin/users/{}/role", clerk_user.id),
            &[("role", "employee")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    assert_eq!(clerk.get("/admin/products").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_cannot_change_own_role() {
    let app = TestApp::new();
    let (mut admin, admin_user) = app.signed_in("admin@example.com", Role::Admin).await;

    let response = admin
        .post_form(
            &format!("/admin/users/{}/role", admin_user.id),
            &[("role", "customer")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(admin.get("/admin/users").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_product_from_json() {
    let app = TestApp::new();
    let category = app.category("Lighting").await;
    let (mut employee, _) = app.signed_in("clerk@example.com", Role::Employee).await;

    let body = employee
        .post_json(
            "/admin/products",
            &json!({
                "name": "Desk Lamp",
                "description": "Warm light",
                "price": "24.99",
                "inventory": 7,
                "images": ["  https://img.test/lamp.jpg  "],
                "category_ids": [category],
            }),
        )
        .await
        .json();
    assert_eq!(body["success"], true);
    assert_eq!(body["sku"], "DESKLAMP");
    assert_eq!(body["synced"], false);

    let body = employee
        .post_json(
            "/admin/products",
            &json!({ "name": "Desk Lamp", "price": "19.00", "inventory": 1, "category_ids": [category] }),
        )
        .await
        .json();
    assert_eq!(body["sku"], "DESKLAMP1");

    let body = employee
        .post_json(
            "/admin/products",
            &json!({ "name": "Lamp", "price": "0", "inventory": 1, "category_ids": [category] }),
        )
        .await
        .json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Price must be greater than zero");

    assert!(app.polar.products().is_empty());
}

#[tokio::test]
async fn test_create_product_syncs_when_enabled() {
    let app = TestApp::with_product_sync(true);
    let category = app.category("Lighting").await;
    let (mut admin, _) = app.signed_in("admin@example.com", Role::Admin).await;

    let body = admin
        .post_json(
            "/admin/products",
            &json!({ "name": "Desk Lamp", "price": "24.99", "inventory": 7, "category_ids": [category] }),
        )
        .await
        .json();
    assert_eq!(body["success"], true);
    assert_eq!(body["synced"], true);

    let sent = app.polar.products();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].prices[0].price_amount, 2499);
}

#[tokio::test]
async fn test_inventory_update_and_sync() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "10.00", 5).await;
    let (mut admin, _) = app.signed_in("admin@example.com", Role::Admin).await;

    let response = admin
        .post_form(
            &format!("/admin/products/{}/inventory", lamp.id),
            &[("inventory", "12")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(app.inventory(lamp.id).await, 12);

    let report = admin.post_json("/admin/products/sync", &json!({})).await.json();
    assert_eq!(report["created"], 1);
    assert_eq!(report["failed"], 0);

    let synced = app.stores.catalog.get_product(lamp.id).await.unwrap().unwrap();
    assert_eq!(synced.polar_product_id.as_deref(), Some("prod_fake_1"));
}
