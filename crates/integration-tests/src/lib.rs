//! Integration test harness for the Emporium storefront.
//!
//! Tests drive the real router in process with `tower::ServiceExt::oneshot`.
//! Everything behind it is in memory: the stores, the session store and a
//! fake Polar that records what it was asked to do.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart` - Cart actions, badge count and stock rules
//! - `checkout` - Hosted checkout creation and completion
//! - `auth` - Registration, login, logout and role gating
//! - `orders` - Order history from the provider
//! - `account` - Account overview from local orders and reviews
//! - `health` - Probes, redirects and response headers

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use emporium_core::{CategoryId, ProductId, Role};
use emporium_storefront::config::{PolarConfig, PolarServer, StorefrontConfig, TelemetryConfig};
use emporium_storefront::db::Stores;
use emporium_storefront::middleware::{SESSION_COOKIE_NAME, session_layer};
use emporium_storefront::models::{NewProduct, Product, User};
use emporium_storefront::polar::PaymentProvider;
pub use emporium_storefront::polar::testing::FakePolar;
use emporium_storefront::services::AuthService;
use emporium_storefront::state::AppState;

/// Public URL the test app believes it runs at.
pub const BASE_URL: &str = "http://shop.test";

/// Password given to every account created by [`TestApp::create_user`].
pub const PASSWORD: &str = "correct horse battery";

// =============================================================================
// Test App
// =============================================================================

/// A storefront wired to in-memory backends.
pub struct TestApp {
    pub router: Router,
    pub stores: Stores,
    pub polar: Arc<FakePolar>,
    next_ip: AtomicU8,
}

impl TestApp {
    /// Build an app with empty stores.
    pub fn new() -> Self {
        Self::with_product_sync(false)
    }

    /// Build an app, optionally creating new products at Polar right away.
    pub fn with_product_sync(sync_products: bool) -> Self {
        Self::build(Stores::memory(), sync_products)
    }

    /// Build an app over the given stores.
    pub fn with_stores(stores: Stores) -> Self {
        Self::build(stores, false)
    }

    fn build(stores: Stores, sync_products: bool) -> Self {
        let polar = Arc::new(FakePolar::default());
        let config = test_config(sync_products);
        let sessions = session_layer(tower_sessions::MemoryStore::default(), &config);
        let payments: Arc<dyn PaymentProvider> = polar.clone();
        let state = AppState::new(config, stores.clone(), payments, None);

        Self {
            router: emporium_storefront::app(state, sessions),
            stores,
            polar,
            next_ip: AtomicU8::new(1),
        }
    }

    /// A new browser with its own cookie jar and client IP.
    pub fn client(&self) -> Client {
        let n = self.next_ip.fetch_add(1, Ordering::SeqCst);
        Client {
            router: self.router.clone(),
            cookie: None,
            ip: format!("203.0.113.{n}"),
        }
    }

    /// Create an account directly in the store.
    pub async fn create_user(&self, email: &str, role: Role) -> User {
        AuthService::new(self.stores.users.clone())
            .create_user(email, "", PASSWORD, role)
            .await
            .unwrap()
    }

    /// A client already signed in as a new account with `role`.
    pub async fn signed_in(&self, email: &str, role: Role) -> (Client, User) {
        let user = self.create_user(email, role).await;
        let mut client = self.client();
        let response = client.login(email, PASSWORD).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "login failed for {email}");
        (client, user)
    }

    /// Create a category.
    pub async fn category(&self, name: &str) -> CategoryId {
        self.stores
            .catalog
            .upsert_category(name, &name.to_lowercase(), None)
            .await
            .unwrap()
            .id
    }

    /// Create an active product. `price` is a decimal string such as `"10.00"`.
    pub async fn product(&self, name: &str, price: &str, inventory: i32) -> Product {
        let category = self.category("General").await;
        let sku = emporium_core::generate_sku(
            name,
            &self.stores.catalog.existing_skus().await.unwrap(),
        );
        self.stores
            .catalog
            .create_product(&NewProduct {
                name: name.to_owned(),
                description: format!("{name} description"),
                price: Decimal::from_str(price).unwrap(),
                sku,
                inventory,
                images: Vec::new(),
                category_ids: vec![category],
            })
            .await
            .unwrap()
    }

    /// Current stock of a product.
    pub async fn inventory(&self, id: ProductId) -> i32 {
        self.stores
            .catalog
            .get_product(id)
            .await
            .unwrap()
            .unwrap()
            .inventory
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config(sync_products: bool) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused/emporium"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: BASE_URL.to_owned(),
        session_secret: SecretString::from("k3P9vXq2Lm8RzT4wYb6NcH1jFd5GsA7e"),
        polar: PolarConfig {
            access_token: SecretString::from("polar_oat_test"),
            server: PolarServer::Sandbox,
            api_url: PolarServer::Sandbox.api_url().to_owned(),
            sync_products,
        },
        telemetry: TelemetryConfig::default(),
    }
}

// =============================================================================
// Client
// =============================================================================

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Parse the body as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("body is not JSON ({e}): {}", self.body))
    }

    /// A response header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Redirect target.
    pub fn location(&self) -> Option<&str> {
        self.header(header::LOCATION.as_str())
    }
}

/// A browser: keeps the session cookie between requests.
pub struct Client {
    router: Router,
    cookie: Option<String>,
    ip: String,
}

impl Client {
    /// Send a request and remember any session cookie it sets.
    pub async fn send(&mut self, method: Method, uri: &str, content_type: Option<&str>, body: String) -> TestResponse {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", &self.ip);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default();
            if let Some(session) = pair.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")) {
                self.cookie = if session.is_empty() {
                    None
                } else {
                    Some(pair.to_owned())
                };
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, String::new()).await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::POST, uri, Some("application/json"), body.to_string())
            .await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.send(
            Method::POST,
            uri,
            Some("application/x-www-form-urlencoded"),
            body,
        )
        .await
    }

    /// Submit the login form.
    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_form("/auth/login", &[("email", email), ("password", password)])
            .await
    }

    /// Whether the browser holds a session cookie.
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }
}
