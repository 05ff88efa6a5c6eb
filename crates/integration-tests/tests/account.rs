//! Account overview built from local records.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use emporium_core::{OrderStatus, Role};
use emporium_integration_tests::TestApp;
use emporium_storefront::models::{NewOrder, NewOrderItem, NewReview, Product, User};

async fn record_order(
    app: &TestApp,
    user: &User,
    product: &Product,
    quantity: i32,
    status: OrderStatus,
) {
    app.stores
        .orders
        .create_order(&NewOrder {
            user_id: user.id,
            status,
            items: vec![NewOrderItem {
                product_id: product.id,
                quantity,
                price: product.price,
            }],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_account_requires_sign_in() {
    let app = TestApp::new();
    let mut browser = app.client();
    let response = browser.get("/account").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/auth/login"));
}

#[tokio::test]
async fn test_new_account_has_no_orders() {
    let app = TestApp::new();
    let (mut browser, _) = app.signed_in("shopper@example.com", Role::Customer).await;

    let page = browser.get("/account").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("shopper@example.com"));
    assert!(page.body.contains("No orders yet"));
    assert!(page.body.contains(r#"data-stat="spend">$0.00<"#));
}

#[tokio::test]
async fn test_account_shows_recent_orders_reviews_and_spend() {
    let app = TestApp::new();
    let lamp = app.product("Desk Lamp", "10.00", 50).await;
    let shade = app.product("Lamp Shade", "15.00", 50).await;
    let (mut browser, user) = app.signed_in("shopper@example.com", Role::Customer).await;
    let (_, other) = app.signed_in("other@example.com", Role::Customer).await;

    for _ in 0..5 {
        record_order(&app, &user, &lamp, 1, OrderStatus::Delivered).await;
    }
    record_order(&app, &user, &lamp, 2, OrderStatus::Cancelled).await;
    record_order(&app, &user, &shade, 3, OrderStatus::Shipped).await;
    record_order(&app, &other, &lamp, 9, OrderStatus::Paid).await;
    app.stores
        .catalog
        .create_review(&NewReview {
            product_id: lamp.id,
            user_id: user.id,
            rating: 4,
            comment: Some("Bright".to_owned()),
        })
        .await
        .unwrap();

    let page = browser.get("/account").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(r#"data-stat="orders">7<"#));
    assert!(page.body.contains(r#"data-stat="reviews">1<"#));
    // 5 x $10.00 delivered + 3 x $15.00 shipped; the cancelled order is left out
    assert!(page.body.contains(r#"data-stat="spend">$95.00<"#));

    // Newest first, five at most
    assert_eq!(page.body.matches(r#"<article class="order">"#).count(), 5);
    let shade_at = page.body.find("Lamp Shade").unwrap();
    let lamp_at = page.body.find("Desk Lamp").unwrap();
    assert!(shade_at < lamp_at);
    assert!(page.body.contains("$45.00"));
    assert!(page.body.contains("cancelled"));
    assert!(!page.body.contains("$90.00"));
}
