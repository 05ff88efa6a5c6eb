//! Persistence for the storefront.
//!
//! # Database: schema `storefront`
//!
//! ## Tables
//!
//! - `user` / `user_password` - Accounts and argon2 password hashes
//! - `category`, `product`, `product_category` - Catalog
//! - `review` - Product reviews
//! - `cart` / `cart_item` - One cart per user, one row per (cart, product)
//! - `order` / `order_item` - Local order records (seed data)
//!
//! Sessions live in `tower_sessions.session`, managed by
//! `tower-sessions-sqlx-store`.
//!
//! # Backends
//!
//! Handlers and services talk to the store traits ([`CartStore`],
//! [`CatalogStore`], [`UserStore`], [`OrderStore`]). [`PgStore`] implements
//! them over `PostgreSQL`; [`MemoryStore`] keeps everything in process for
//! tests and local runs without a database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```

mod carts;
mod memory;
mod orders;
mod products;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use emporium_core::{CartId, CategoryId, Email, ProductId, Role, UserId};

use crate::models::{
    Cart, CartItem, CartLine, Category, NewOrder, NewProduct, NewReview, NewUser, Order,
    OrderDetail, OrderTotals, Page, Product, ProductFilter, Review, User, UserFilter, UserSummary,
};

pub use memory::MemoryStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Store Traits
// =============================================================================

/// Cart and cart item persistence.
///
/// Stock checks on writes are part of the statement itself: a guarded write
/// returns `Ok(None)` instead of touching the row when the product does not
/// have enough inventory.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Return the user's cart, creating it if it does not exist.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// Return the user's cart without creating one.
    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Find the item for a product in a cart.
    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Insert the item or add `quantity` to the existing row, provided the
    /// product exists and has at least `quantity` units in stock.
    async fn add_item_guarded(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Overwrite the quantity of an existing item, provided the product has
    /// at least `quantity` units in stock. `None` when the item is missing
    /// or stock is short.
    async fn set_item_quantity_guarded(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Delete the item; returns whether a row was removed.
    async fn delete_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;

    /// Delete every item of the cart; returns the number of rows removed.
    async fn clear_items(&self, cart_id: CartId) -> Result<u64, RepositoryError>;

    /// Items joined with their products, oldest item first.
    async fn load_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Remember the provider checkout session created for this cart.
    async fn set_checkout_session(
        &self,
        cart_id: CartId,
        session_id: &str,
    ) -> Result<(), RepositoryError>;
}

/// Products, categories and reviews.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Get a product by ID, active or not.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Active products matching the filter, newest first.
    async fn list_products(
        &self,
        filter: &ProductFilter,
        per_page: u32,
    ) -> Result<Page<Product>, RepositoryError>;

    /// Every product, newest first (admin listing).
    async fn list_all_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Products that have no payment provider ID yet.
    async fn unmapped_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// All SKUs in use.
    async fn existing_skus(&self) -> Result<Vec<String>, RepositoryError>;

    /// Insert a product and link it to its categories.
    ///
    /// Fails with `Conflict` when the SKU is taken.
    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Store the payment provider product ID.
    async fn set_provider_id(
        &self,
        id: ProductId,
        provider_id: &str,
    ) -> Result<(), RepositoryError>;

    /// Overwrite the stock level. Fails with `NotFound` for unknown products.
    async fn set_inventory(
        &self,
        id: ProductId,
        inventory: i32,
    ) -> Result<Product, RepositoryError>;

    /// All categories by name.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Categories linked to a product.
    async fn product_categories(&self, id: ProductId) -> Result<Vec<Category>, RepositoryError>;

    /// Insert a category, or update the name and description of the one
    /// with the same slug.
    async fn upsert_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, RepositoryError>;

    /// Reviews for a product, newest first.
    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError>;

    /// Record a review.
    async fn create_review(&self, review: &NewReview) -> Result<Review, RepositoryError>;

    /// Number of reviews written by a user.
    async fn count_reviews_by_user(&self, user_id: UserId) -> Result<i64, RepositoryError>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get a user by email.
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Create a user with a password hash. `Conflict` if the email is taken.
    async fn create_with_password(
        &self,
        user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Get a user together with their password hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Users matching the filter with their local order counts, newest first.
    async fn list_users(
        &self,
        filter: &UserFilter,
        per_page: u32,
    ) -> Result<Page<UserSummary>, RepositoryError>;

    /// Change a user's role. `NotFound` for unknown users.
    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError>;
}

/// Local order records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Record an order and its items.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// The user's `limit` most recent orders with their lines, newest first.
    async fn recent_orders(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<OrderDetail>, RepositoryError>;

    /// Order count and spend over every order of the user.
    async fn order_totals(&self, user_id: UserId) -> Result<OrderTotals, RepositoryError>;
}

// =============================================================================
// Backends
// =============================================================================

/// `PostgreSQL` implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// The store handles used by services, one per concern.
///
/// Usually all four point at the same backend.
#[derive(Clone)]
pub struct Stores {
    pub carts: Arc<dyn CartStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub users: Arc<dyn UserStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    /// Use one backend for every store.
    #[must_use]
    pub fn backed_by<B>(backend: B) -> Self
    where
        B: CartStore + CatalogStore + UserStore + OrderStore + 'static,
    {
        let backend = Arc::new(backend);
        let carts: Arc<dyn CartStore> = backend.clone();
        let catalog: Arc<dyn CatalogStore> = backend.clone();
        let users: Arc<dyn UserStore> = backend.clone();
        let orders: Arc<dyn OrderStore> = backend;
        Self {
            carts,
            catalog,
            users,
            orders,
        }
    }

    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::backed_by(PgStore::new(pool))
    }

    /// Stores backed by a fresh in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::backed_by(MemoryStore::new())
    }
}
