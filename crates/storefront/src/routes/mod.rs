//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Redirect to /products
//! GET  /health, /health/ready    - Liveness and readiness probes
//!
//! # Catalog
//! GET  /products                 - Product listing (?search=&category=&page=)
//! GET  /products/{id}            - Product detail
//!
//! # Cart (JSON actions, signed-in users)
//! GET  /cart                     - Cart page
//! GET  /cart/contents            - Cart contents
//! GET  /cart/count               - Badge count
//! POST /cart/add|update|remove|clear
//!
//! # Checkout
//! GET  /checkout                 - Review page
//! POST /checkout                 - Create hosted checkout session
//! GET  /checkout/success         - Clears the cart
//! GET  /checkout/canceled
//!
//! # Orders
//! GET  /orders                   - Order history page
//! GET  /api/orders               - Order history (JSON)
//! GET  /account                  - Account overview from local records
//!
//! # Auth
//! GET|POST /auth/login, /auth/register
//! POST /auth/logout
//!
//! # Admin
//! GET  /admin/users              - admin only
//! POST /admin/users/{id}/role    - admin only
//! POST /admin/products/sync      - admin only
//! GET  /admin/products           - admin or employee
//! GET  /admin/products/new       - admin or employee
//! POST /admin/products           - admin or employee (JSON body)
//! POST /admin/products/{id}/inventory
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use rust_decimal::Decimal;

use emporium_core::{CurrencyCode, Money};

use crate::middleware::{action_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Client-side event emitted after any successful cart mutation.
pub const CART_UPDATED_TRIGGER: &str = "cart-updated";

/// Format a price in the store currency, e.g. `$12.50`.
pub(crate) fn format_price(amount: Decimal) -> String {
    Money::new(amount, CurrencyCode::USD).to_string()
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let actions = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .layer(action_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/contents", get(cart::contents))
        .route("/count", get(cart::count))
        .merge(actions)
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(checkout::show).post(checkout::create).layer(action_rate_limiter()),
        )
        .route("/success", get(checkout::success))
        .route("/canceled", get(checkout::canceled))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::users))
        .route("/users/{id}/role", post(admin::set_role))
        .route("/products", get(admin::products).post(admin::create_product))
        .route("/products/new", get(admin::new_product))
        .route("/products/sync", post(admin::sync_products))
        .route("/products/{id}/inventory", post(admin::set_inventory))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/products") }))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/orders", get(orders::index))
        .route("/api/orders", get(orders::api_index))
        .route("/account", get(account::show))
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity when the state is backed by `PostgreSQL`.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
