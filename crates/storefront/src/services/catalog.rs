//! Product catalog: public listing, admin product management and
//! synchronization of products to the payment provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::{CategoryId, CurrencyCode, ProductId, generate_sku};

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, NewProduct, Page, Product, ProductFilter, Review};
use crate::polar::{CreatePrice, CreateProduct, PaymentProvider};

use super::ShopError;

/// Products per page on the public listing.
pub const PRODUCTS_PER_PAGE: u32 = 12;

/// Minimum product name length.
const MIN_NAME_LENGTH: usize = 3;

/// A product with everything its detail page shows.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    pub categories: Vec<Category>,
    pub reviews: Vec<Review>,
}

impl ProductDetail {
    /// Mean review rating, if there are reviews.
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: f64 = self.reviews.iter().map(|r| f64::from(r.rating)).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.reviews.len() as f64;
        Some(sum / count)
    }
}

/// Admin input for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub inventory: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

impl ProductInput {
    fn validate(&self) -> Result<(), ShopError> {
        if self.name.trim().chars().count() < MIN_NAME_LENGTH {
            return Err(ShopError::Validation(format!(
                "Name must be at least {MIN_NAME_LENGTH} characters"
            )));
        }
        if self.price <= Decimal::ZERO {
            return Err(ShopError::Validation(
                "Price must be greater than zero".to_string(),
            ));
        }
        if self.inventory < 0 {
            return Err(ShopError::Validation(
                "Inventory cannot be negative".to_string(),
            ));
        }
        if self.category_ids.is_empty() {
            return Err(ShopError::Validation(
                "Select at least one category".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of pushing unmapped products to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub failed: usize,
}

/// Catalog operations.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    payments: Arc<dyn PaymentProvider>,
    sync_products: bool,
}

impl CatalogService {
    /// With `sync_products` set, newly created products are also created at
    /// the payment provider.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        payments: Arc<dyn PaymentProvider>,
        sync_products: bool,
    ) -> Self {
        Self {
            catalog,
            payments,
            sync_products,
        }
    }

    /// One page of active products.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, ShopError> {
        Ok(self
            .catalog
            .list_products(filter, PRODUCTS_PER_PAGE)
            .await?)
    }

    /// An active product with its categories and reviews.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist or is inactive.
    #[instrument(skip(self))]
    pub async fn product_detail(&self, id: ProductId) -> Result<ProductDetail, ShopError> {
        let product = self
            .catalog
            .get_product(id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ShopError::NotFound("product"))?;
        let categories = self.catalog.product_categories(id).await?;
        let reviews = self.catalog.list_reviews(id).await?;
        Ok(ProductDetail {
            product,
            categories,
            reviews,
        })
    }

    /// Every product, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    pub async fn list_all_products(&self) -> Result<Vec<Product>, ShopError> {
        Ok(self.catalog.list_all_products().await?)
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ShopError> {
        Ok(self.catalog.list_categories().await?)
    }

    /// Validate and create a product with a generated SKU.
    ///
    /// A failure to create the product at the provider is logged and the
    /// local product is kept without a provider ID.
    ///
    /// # Errors
    ///
    /// - `Validation` if the input is invalid or names an unknown category
    /// - `DuplicateSku` if the generated SKU was taken concurrently
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: ProductInput) -> Result<Product, ShopError> {
        input.validate()?;

        let categories = self.catalog.list_categories().await?;
        if let Some(unknown) = input
            .category_ids
            .iter()
            .find(|id| !categories.iter().any(|c| c.id == **id))
        {
            return Err(ShopError::Validation(format!("Unknown category {unknown}")));
        }

        let existing = self.catalog.existing_skus().await?;
        let sku = generate_sku(&input.name, &existing);

        let new_product = NewProduct {
            name: input.name.trim().to_owned(),
            description: input.description.trim().to_owned(),
            price: input.price,
            sku: sku.clone(),
            inventory: input.inventory,
            images: input
                .images
                .into_iter()
                .map(|url| url.trim().to_owned())
                .filter(|url| !url.is_empty())
                .collect(),
            category_ids: input.category_ids,
        };

        let mut product = self
            .catalog
            .create_product(&new_product)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ShopError::DuplicateSku(sku),
                other => other.into(),
            })?;
        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");

        if self.sync_products {
            match self.sync_product(&product).await {
                Ok(provider_id) => product.polar_product_id = Some(provider_id),
                Err(e) => tracing::warn!(
                    error = %e,
                    product_id = %product.id,
                    "Provider sync failed; product kept without provider ID"
                ),
            }
        }

        Ok(product)
    }

    /// Create provider products for every product that lacks one.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the unmapped products cannot be listed.
    /// Individual provider failures are counted, not returned.
    #[instrument(skip(self))]
    pub async fn sync_unmapped(&self) -> Result<SyncReport, ShopError> {
        let mut report = SyncReport::default();
        for product in self.catalog.unmapped_products().await? {
            match self.sync_product(&product).await {
                Ok(_) => report.created += 1,
                Err(e) => {
                    tracing::warn!(error = %e, product_id = %product.id, "Provider sync failed");
                    report.failed += 1;
                }
            }
        }
        tracing::info!(created = report.created, failed = report.failed, "Product sync finished");
        Ok(report)
    }

    /// Overwrite a product's stock level.
    ///
    /// # Errors
    ///
    /// - `Validation` if `inventory` is negative
    /// - `NotFound` if the product does not exist
    #[instrument(skip(self))]
    pub async fn set_inventory(&self, id: ProductId, inventory: i32) -> Result<Product, ShopError> {
        if inventory < 0 {
            return Err(ShopError::Validation(
                "Inventory cannot be negative".to_string(),
            ));
        }
        self.catalog
            .set_inventory(id, inventory)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ShopError::NotFound("product"),
                other => other.into(),
            })
    }

    /// Create the product at the provider and store the returned ID.
    async fn sync_product(&self, product: &Product) -> Result<String, ShopError> {
        let currency = CurrencyCode::USD;
        let amount = product
            .unit_price()
            .to_minor_units()
            .ok_or_else(|| ShopError::Validation("Price out of range".to_string()))?;

        let mut metadata = BTreeMap::new();
        metadata.insert("sku".to_owned(), product.sku.clone());
        metadata.insert("product_id".to_owned(), product.id.to_string());

        let request = CreateProduct {
            name: product.name.clone(),
            description: Some(product.description.clone()).filter(|d| !d.is_empty()),
            prices: vec![CreatePrice::fixed(amount, currency.code())],
            metadata,
        };
        let created = self.payments.create_product(&request).await?;
        self.catalog.set_provider_id(product.id, &created.id).await?;
        Ok(created.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::Stores;
    use crate::polar::testing::FakePolar;

    async fn setup(
        provider: &Arc<FakePolar>,
        sync: bool,
    ) -> (CatalogService, Stores, CategoryId) {
        let stores = Stores::memory();
        let category = stores
            .catalog
            .upsert_category("Lighting", "lighting", None)
            .await
            .unwrap();
        let service = CatalogService::new(Arc::clone(&stores.catalog), provider.clone(), sync);
        (service, stores, category.id)
    }

    fn input(name: &str, category: CategoryId) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: "Warm light".to_string(),
            price: Decimal::new(2_499, 2),
            inventory: 4,
            images: vec![" https://img.example.com/lamp.jpg ".to_string(), String::new()],
            category_ids: vec![category],
        }
    }

    #[tokio::test]
    async fn test_create_generates_unique_skus() {
        let provider = Arc::new(FakePolar::default());
        let (catalog, _, category) = setup(&provider, false).await;

        let first = catalog.create_product(input("Desk Lamp", category)).await.unwrap();
        let second = catalog.create_product(input("desk lamp!", category)).await.unwrap();

        assert_eq!(first.sku, "DESKLAMP");
        assert_eq!(second.sku, "DESKLAMP1");
        assert_eq!(first.images, vec!["https://img.example.com/lamp.jpg".to_string()]);
        assert!(provider.products().is_empty());
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let provider = Arc::new(FakePolar::default());
        let (catalog, _, category) = setup(&provider, false).await;

        let mut bad = input("ab", category);
        assert!(matches!(
            catalog.create_product(bad.clone()).await,
            Err(ShopError::Validation(_))
        ));

        bad.name = "Lamp".to_string();
        bad.price = Decimal::ZERO;
        assert!(matches!(
            catalog.create_product(bad.clone()).await,
            Err(ShopError::Validation(_))
        ));

        bad.price = Decimal::ONE;
        bad.category_ids = vec![CategoryId::new(999)];
        let err = catalog.create_product(bad).await.unwrap_err();
        assert_eq!(err.user_message(), "Unknown category 999");
    }

    #[tokio::test]
    async fn test_create_syncs_price_in_minor_units() {
        let provider = Arc::new(FakePolar::default());
        let (catalog, stores, category) = setup(&provider, true).await;

        let product = catalog.create_product(input("Desk Lamp", category)).await.unwrap();

        let sent = provider.products();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].prices[0].price_amount, 2_499);
        assert_eq!(sent[0].prices[0].price_currency, "usd");
        assert_eq!(sent[0].metadata["sku"], "DESKLAMP");
        assert_eq!(product.polar_product_id.as_deref(), Some("prod_fake_1"));
        let stored = stores.catalog.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.polar_product_id, product.polar_product_id);
    }

    #[tokio::test]
    async fn test_sync_failure_keeps_local_product() {
        let provider = Arc::new(FakePolar::failing());
        let (catalog, stores, category) = setup(&provider, true).await;

        let product = catalog.create_product(input("Desk Lamp", category)).await.unwrap();
        assert!(product.polar_product_id.is_none());
        assert_eq!(stores.catalog.unmapped_products().await.unwrap().len(), 1);

        let report = catalog.sync_unmapped().await.unwrap();
        assert_eq!(report, SyncReport { created: 0, failed: 1 });
    }

    #[tokio::test]
    async fn test_sync_unmapped_maps_every_product() {
        let provider = Arc::new(FakePolar::default());
        let (catalog, stores, category) = setup(&provider, false).await;
        catalog.create_product(input("Desk Lamp", category)).await.unwrap();
        catalog.create_product(input("Floor Lamp", category)).await.unwrap();

        let report = catalog.sync_unmapped().await.unwrap();
        assert_eq!(report, SyncReport { created: 2, failed: 0 });
        assert!(stores.catalog.unmapped_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detail_hides_missing_products() {
        let provider = Arc::new(FakePolar::default());
        let (catalog, _, category) = setup(&provider, false).await;
        let product = catalog.create_product(input("Desk Lamp", category)).await.unwrap();

        let detail = catalog.product_detail(product.id).await.unwrap();
        assert_eq!(detail.categories.len(), 1);
        assert!(detail.average_rating().is_none());

        let err = catalog.product_detail(ProductId::new(404)).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound("product")));
    }

    #[tokio::test]
    async fn test_set_inventory() {
        let provider = Arc::new(FakePolar::default());
        let (catalog, _, category) = setup(&provider, false).await;
        let product = catalog.create_product(input("Desk Lamp", category)).await.unwrap();

        assert_eq!(catalog.set_inventory(product.id, 0).await.unwrap().inventory, 0);
        assert!(matches!(
            catalog.set_inventory(product.id, -1).await,
            Err(ShopError::Validation(_))
        ));
        assert!(matches!(
            catalog.set_inventory(ProductId::new(404), 3).await,
            Err(ShopError::NotFound("product"))
        ));
    }
}
