//! Probes, redirects, response headers and public catalog pages.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use emporium_integration_tests::TestApp;

#[tokio::test]
async fn test_health_probes() {
    let app = TestApp::new();
    let mut browser = app.client();

    let response = browser.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");

    // No database pool in memory mode
    assert_eq!(browser.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_root_redirects_to_products() {
    let app = TestApp::new();
    let response = app.client().get("/").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/products"));
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::new();
    let response = app.client().get("/products").await;

    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert!(response.header("x-request-id").is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_catalog_is_public() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "24.99", 3).await;
    app.product("Bookshelf", "89.00", 1).await;
    let mut browser = app.client();

    let listing = browser.get("/products").await;
    assert_eq!(listing.status, StatusCode::OK);
    assert!(listing.body.contains("Desk Lamp"));
    assert!(listing.body.contains("Bookshelf"));

    let search = browser.get("/products?search=lamp").await;
    assert!(search.body.contains("Desk Lamp"));
    assert!(!search.body.contains("Bookshelf"));

    let detail = browser.get(&format!("/products/{}", lamp.id)).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert!(detail.body.contains("$24.99"));
}

#[tokio::test]
async fn test_unknown_products_are_not_found() {
    let app = TestApp::new();
    let mut browser = app.client();

    assert_eq!(browser.get("/products/999").await.status, StatusCode::NOT_FOUND);
    assert!(browser.get("/products/abc").await.status.is_client_error());
}
