//! Catalog domain types: products, categories and reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use emporium_core::{CategoryId, CurrencyCode, Money, ProductId, ReviewId, UserId};

/// A product in the local catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Unit price in major units (store currency).
    pub price: Decimal,
    pub sku: String,
    /// Units in stock. Never negative.
    pub inventory: i32,
    pub is_active: bool,
    pub images: Vec<String>,
    /// Product ID at the payment provider, once synced.
    pub polar_product_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price as [`Money`] in the store currency.
    #[must_use]
    pub const fn unit_price(&self) -> Money {
        Money::new(self.price, CurrencyCode::USD)
    }

    /// First image, used for listing cards and cart rows.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether at least `quantity` units are in stock.
    #[must_use]
    pub const fn has_stock_for(&self, quantity: i32) -> bool {
        self.inventory >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub sku: String,
    pub inventory: i32,
    pub images: Vec<String>,
    pub category_ids: Vec<CategoryId>,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// A customer review of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// Reviewer's display name at query time.
    pub author: String,
    /// Rating from 1 to 5.
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: i16,
    pub comment: Option<String>,
}

/// Filters for the public product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring matched against name and description.
    pub search: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// 1-based page number.
    pub page: u32,
}
