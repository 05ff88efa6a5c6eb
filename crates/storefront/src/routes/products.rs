//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::ProductId;

use super::format_price;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{Category, CurrentUser, Product, ProductFilter, Review};
use crate::state::AppState;

/// Product card data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub inventory: i32,
    pub in_stock: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: format_price(product.price),
            image: product.primary_image().map(str::to_owned),
            images: product.images.clone(),
            inventory: product.inventory,
            in_stock: product.inventory > 0,
        }
    }
}

/// Review data for templates.
#[derive(Clone)]
pub struct ReviewView {
    pub author: String,
    pub rating: i16,
    pub comment: String,
    pub date: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            author: review.author.clone(),
            rating: review.rating,
            comment: review.comment.clone().unwrap_or_default(),
            date: review.created_at.format("%B %-d, %Y").to_string(),
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<ProductView>,
    pub categories: Vec<Category>,
    pub search: String,
    pub category: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
    pub total: u64,
}

impl ProductsIndexTemplate {
    /// Link to another page of the same listing.
    #[must_use]
    pub fn page_link(&self, page: u32) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if !self.search.is_empty() {
            query.append_pair("search", &self.search);
        }
        if !self.category.is_empty() {
            query.append_pair("category", &self.category);
        }
        query.append_pair("page", &page.to_string());
        format!("/products?{}", query.finish())
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub user: Option<CurrentUser>,
    pub product: ProductView,
    pub categories: Vec<Category>,
    pub reviews: Vec<ReviewView>,
    pub average_rating: Option<String>,
}

/// Display the product listing page.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ListingQuery>,
) -> Result<ProductsIndexTemplate> {
    let search = query.search.unwrap_or_default().trim().to_owned();
    let category = query.category.unwrap_or_default().trim().to_owned();
    let filter = ProductFilter {
        search: Some(search.clone()).filter(|s| !s.is_empty()),
        category: Some(category.clone()).filter(|c| !c.is_empty()),
        page: query.page.unwrap_or(1).max(1),
    };

    let catalog = state.catalog();
    let page = catalog.list_products(&filter).await?;
    let categories = catalog.list_categories().await?;

    Ok(ProductsIndexTemplate {
        user,
        products: page.items.iter().map(ProductView::from).collect(),
        categories,
        search,
        category,
        current_page: page.page,
        total_pages: page.total_pages(),
        has_prev: page.has_prev(),
        has_next: page.has_next(),
        total: page.total,
    })
}

/// Display a product.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<ProductShowTemplate> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("product {id}")))?;
    let detail = state.catalog().product_detail(id).await?;

    Ok(ProductShowTemplate {
        user,
        average_rating: detail.average_rating().map(|r| format!("{r:.1}")),
        product: ProductView::from(&detail.product),
        categories: detail.categories,
        reviews: detail.reviews.iter().map(ReviewView::from).collect(),
    })
}
