//! Registration, login, logout and role gating.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use emporium_core::{Email, Role};
use emporium_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_register_signs_in() {
    let app = TestApp::new();
    let mut browser = app.client();

    let response = browser
        .post_form(
            "/auth/register",
            &[
                ("email", "New.Shopper@Example.com"),
                ("name", "New Shopper"),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/products"));
    assert!(browser.has_session());

    let page = browser.get("/cart").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("New Shopper"));

    let user = app
        .stores
        .users
        .get_by_email(&Email::parse("new.shopper@example.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, Role::Customer);
}

#[tokio::test]
async fn test_register_rejections() {
    let app = TestApp::new();
    app.create_user("taken@example.com", Role::Customer).await;
    let mut browser = app.client();

    let response = browser
        .post_form(
            "/auth/register",
            &[
                ("email", "someone@example.com"),
                ("password", PASSWORD),
                ("password_confirm", "something else"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("Passwords do not match"));

    let response = browser
        .post_form(
            "/auth/register",
            &[
                ("email", "taken@example.com"),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(!browser.has_session());
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let app = TestApp::new();
    app.create_user("shopper@example.com", Role::Customer).await;
    let mut browser = app.client();

    let wrong_password = browser.login("shopper@example.com", "not the password").await;
    let unknown_user = browser.login("nobody@example.com", PASSWORD).await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert!(wrong_password.body.contains("Invalid email or password"));
    assert!(unknown_user.body.contains("Invalid email or password"));
}

#[tokio::test]
async fn test_login_redirects_to_next() {
    let app = TestApp::new();
    app.create_user("shopper@example.com", Role::Customer).await;
    let mut browser = app.client();

    let response = browser
        .post_form(
            "/auth/login",
            &[
                ("email", "shopper@example.com"),
                ("password", PASSWORD),
                ("next", "/orders"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/orders"));

    // Already signed in: the login page bounces
    let response = browser.get("/auth/login").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new();
    let (mut browser, _) = app.signed_in("shopper@example.com", Role::Customer).await;
    assert_eq!(browser.get("/cart").await.status, StatusCode::OK);

    let response = browser.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let response = browser.get("/cart").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/auth/login"));
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = TestApp::new();
    let mut browser = app.client();

    let mut statuses = Vec::new();
    for _ in 0..8 {
        statuses.push(browser.login("nobody@example.com", "wrong password").await.status);
    }

    assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));

    // Other clients are unaffected
    let mut other = app.client();
    assert_eq!(
        other.login("nobody@example.com", "wrong password").await.status,
        StatusCode::UNAUTHORIZED
    );
}
