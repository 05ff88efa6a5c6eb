//! Seed the storefront database from a YAML file.
//!
//! # Usage
//!
//! ```bash
//! emporium seed seed/catalog.yaml
//! emporium seed seed/catalog.yaml --clear   # wipe catalog, carts and orders first
//! ```
//!
//! # File Format
//!
//! ```yaml
//! categories:
//!   - { name: Lighting, slug: lighting, description: Lamps and bulbs }
//! users:
//!   - { email: admin@example.com, name: Admin, password: "...", role: admin }
//! products:
//!   - name: Desk Lamp
//!     price: "24.99"
//!     inventory: 10
//!     categories: [lighting]
//! reviews:
//!   - { product: Desk Lamp, user: admin@example.com, rating: 5, comment: Bright }
//! orders:
//!   - user: admin@example.com
//!     status: delivered
//!     items: [{ product: Desk Lamp, quantity: 1 }]
//! ```
//!
//! Products, reviews and orders refer to products by name and to users by
//! email. Seeding is additive: existing categories are updated by slug,
//! existing users and products (by name) are skipped.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use emporium_core::{Email, OrderStatus, ProductId, Role, UserId, generate_sku};
use emporium_storefront::db::{RepositoryError, Stores};
use emporium_storefront::models::{NewOrder, NewOrderItem, NewProduct, NewReview, Product};
use emporium_storefront::services::{AuthError, AuthService};

use super::{CommandError, connect};

/// Tables emptied by `--clear`. Accounts are kept.
const CLEAR_SQL: &str = "TRUNCATE storefront.review, storefront.order_item, storefront.order, \
     storefront.cart_item, storefront.cart, storefront.product_category, storefront.product, \
     storefront.category RESTART IDENTITY CASCADE";

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Failed to read {0}: {1}")]
    Read(String, std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The file refers to something it does not define.
    #[error("Invalid seed data: {0}")]
    Invalid(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// File Format
// =============================================================================

/// Top-level seed document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub reviews: Vec<SeedReview>,
    #[serde(default)]
    pub orders: Vec<SeedOrder>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    /// Generated from the name when omitted.
    pub sku: Option<String>,
    #[serde(default)]
    pub inventory: i32,
    #[serde(default)]
    pub images: Vec<String>,
    /// Category slugs.
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedReview {
    pub product: String,
    pub user: String,
    pub rating: i16,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedOrder {
    pub user: String,
    #[serde(default)]
    pub status: OrderStatus,
    pub items: Vec<SeedOrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct SeedOrderItem {
    pub product: String,
    pub quantity: i32,
}

/// What a seed run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub users_created: usize,
    pub users_skipped: usize,
    pub products_created: usize,
    pub products_skipped: usize,
    pub reviews: usize,
    pub orders: usize,
}

// =============================================================================
// Command
// =============================================================================

/// Seed the database from a YAML file.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed, refers to
/// unknown categories, products or users, or a database write fails.
pub async fn run(file_path: &str, clear_existing: bool) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading seed file");

    // Parse before connecting so a typo fails fast
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SeedError::Read(file_path.to_owned(), e))?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let pool = connect().await?;
    if clear_existing {
        warn!("Clearing catalog, carts and orders");
        sqlx::query(CLEAR_SQL).execute(&pool).await?;
    }

    let summary = apply(&Stores::postgres(pool), &seed).await?;

    info!("Seeding complete!");
    info!("  Categories: {}", summary.categories);
    info!(
        "  Users: {} created, {} skipped (already exist)",
        summary.users_created, summary.users_skipped
    );
    info!(
        "  Products: {} created, {} skipped (already exist)",
        summary.products_created, summary.products_skipped
    );
    info!("  Reviews: {}", summary.reviews);
    info!("  Orders: {}", summary.orders);
    Ok(())
}

/// Write the seed document through the stores.
///
/// # Errors
///
/// See [`run`].
pub async fn apply(stores: &Stores, seed: &SeedFile) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    // Categories
    let mut categories = HashMap::new();
    for category in &seed.categories {
        let saved = stores
            .catalog
            .upsert_category(&category.name, &category.slug, category.description.as_deref())
            .await?;
        categories.insert(saved.slug.clone(), saved.id);
        summary.categories += 1;
    }
    for existing in stores.catalog.list_categories().await? {
        categories.entry(existing.slug).or_insert(existing.id);
    }

    // Users
    let auth = AuthService::new(stores.users.clone());
    for user in &seed.users {
        match auth
            .create_user(&user.email, &user.name, &user.password, user.role)
            .await
        {
            Ok(_) => summary.users_created += 1,
            Err(AuthError::UserAlreadyExists) => summary.users_skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    // Products
    let mut products: HashMap<String, Product> = stores
        .catalog
        .list_all_products()
        .await?
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect();
    let mut skus = stores.catalog.existing_skus().await?;

    for product in &seed.products {
        if products.contains_key(&product.name) {
            summary.products_skipped += 1;
            continue;
        }

        let category_ids = product
            .categories
            .iter()
            .map(|slug| {
                categories.get(slug).copied().ok_or_else(|| {
                    SeedError::Invalid(format!("product '{}': unknown category '{slug}'", product.name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sku = product
            .sku
            .clone()
            .unwrap_or_else(|| generate_sku(&product.name, &skus));
        let created = stores
            .catalog
            .create_product(&NewProduct {
                name: product.name.clone(),
                description: product.description.clone(),
                price: product.price,
                sku: sku.clone(),
                inventory: product.inventory,
                images: product.images.clone(),
                category_ids,
            })
            .await?;
        skus.push(sku);
        products.insert(created.name.clone(), created);
        summary.products_created += 1;
    }

    let product_by_name = |name: &str| -> Result<&Product, SeedError> {
        products
            .get(name)
            .ok_or_else(|| SeedError::Invalid(format!("unknown product '{name}'")))
    };

    // Reviews
    for review in &seed.reviews {
        let product_id: ProductId = product_by_name(&review.product)?.id;
        let user_id = user_id_by_email(stores, &review.user).await?;
        stores
            .catalog
            .create_review(&NewReview {
                product_id,
                user_id,
                rating: review.rating.clamp(1, 5),
                comment: review.comment.clone(),
            })
            .await?;
        summary.reviews += 1;
    }

    // Orders
    for order in &seed.orders {
        let user_id = user_id_by_email(stores, &order.user).await?;
        let items = order
            .items
            .iter()
            .map(|item| {
                product_by_name(&item.product).map(|product| NewOrderItem {
                    product_id: product.id,
                    quantity: item.quantity,
                    price: product.price,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        stores
            .orders
            .create_order(&NewOrder {
                user_id,
                status: order.status,
                items,
            })
            .await?;
        summary.orders += 1;
    }

    Ok(summary)
}

async fn user_id_by_email(stores: &Stores, email: &str) -> Result<UserId, SeedError> {
    let parsed = Email::parse(email)
        .map_err(|e| SeedError::Invalid(format!("user '{email}': {e}")))?;
    stores
        .users
        .get_by_email(&parsed)
        .await?
        .map(|user| user.id)
        .ok_or_else(|| SeedError::Invalid(format!("unknown user '{email}'")))
}
