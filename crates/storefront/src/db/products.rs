//! Catalog queries: products, categories and reviews.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use emporium_core::{CategoryId, ProductId, ReviewId, UserId};

use super::{CatalogStore, PgStore, RepositoryError, conflict_on_unique};
use crate::models::{Category, NewProduct, NewReview, Page, Product, ProductFilter, Review};

/// Columns selected for every product query, aliased to `p`.
const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.sku, p.inventory, \
     p.is_active, p.images, p.polar_product_id, p.created_at, p.updated_at";

/// Shared filter for the public listing: `$1` search text, `$2` category slug.
const LISTING_FILTER: &str = "p.is_active \
     AND ($1::TEXT IS NULL OR p.name ILIKE '%' || $1 || '%' OR p.description ILIKE '%' || $1 || '%') \
     AND ($2::TEXT IS NULL OR EXISTS ( \
         SELECT 1 FROM storefront.product_category pc \
         JOIN storefront.category c ON c.id = pc.category_id \
         WHERE pc.product_id = p.id AND c.slug = $2))";

#[derive(sqlx::FromRow)]
pub(super) struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub sku: String,
    pub inventory: i32,
    pub is_active: bool,
    pub images: Vec<String>,
    pub polar_product_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        if row.inventory < 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "product {} has negative inventory {}",
                row.id, row.inventory
            )));
        }
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            sku: row.sku,
            inventory: row.inventory,
            is_active: row.is_active,
            images: row.images,
            polar_product_id: row.polar_product_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    description: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    author: String,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            author: row.author,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

fn collect_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE p.id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        per_page: u32,
    ) -> Result<Page<Product>, RepositoryError> {
        let page = filter.page.max(1);
        let offset = i64::try_from(Page::<Product>::offset(page, per_page)).unwrap_or(i64::MAX);

        let count_sql = format!("SELECT COUNT(*) FROM storefront.product p WHERE {LISTING_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.search.as_deref())
            .bind(filter.category.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE {LISTING_FILTER} \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(filter.search.as_deref())
            .bind(filter.category.as_deref())
            .bind(i64::from(per_page))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: collect_products(rows)?,
            page,
            per_page,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn list_all_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        collect_products(rows)
    }

    async fn unmapped_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p \
             WHERE p.polar_product_id IS NULL ORDER BY p.id"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        collect_products(rows)
    }

    async fn existing_skus(&self) -> Result<Vec<String>, RepositoryError> {
        let skus = sqlx::query_scalar("SELECT sku FROM storefront.product")
            .fetch_all(&self.pool)
            .await?;
        Ok(skus)
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO storefront.product AS p (name, description, price, sku, inventory, images) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.sku)
            .bind(product.inventory)
            .bind(&product.images)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "sku"))?;

        let category_ids: Vec<i32> = product.category_ids.iter().map(|id| id.as_i32()).collect();
        sqlx::query(
            r"
            INSERT INTO storefront.product_category (product_id, category_id)
            SELECT $1, category_id FROM UNNEST($2::INTEGER[]) AS category_id
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(row.id)
        .bind(&category_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Product::try_from(row)
    }

    async fn set_provider_id(
        &self,
        id: ProductId,
        provider_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.product
            SET polar_product_id = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(provider_id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "provider product id"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_inventory(
        &self,
        id: ProductId,
        inventory: i32,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            "UPDATE storefront.product AS p SET inventory = $2, updated_at = NOW() \
             WHERE p.id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(inventory)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM storefront.category ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn product_categories(&self, id: ProductId) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT c.id, c.name, c.slug, c.description
            FROM storefront.category c
            JOIN storefront.product_category pc ON pc.category_id = c.id
            WHERE pc.product_id = $1
            ORDER BY c.name
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn upsert_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO storefront.category (name, slug, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE
                SET name = EXCLUDED.name, description = EXCLUDED.description
            RETURNING id, name, slug, description
            ",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT r.id, r.product_id, r.user_id,
                   COALESCE(NULLIF(u.name, ''), split_part(u.email, '@', 1)) AS author,
                   r.rating, r.comment, r.created_at
            FROM storefront.review r
            JOIN storefront.user u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            ",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn create_review(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            WITH inserted AS (
                INSERT INTO storefront.review (product_id, user_id, rating, comment)
                VALUES ($1, $2, $3, $4)
                RETURNING id, product_id, user_id, rating, comment, created_at
            )
            SELECT i.id, i.product_id, i.user_id,
                   COALESCE(NULLIF(u.name, ''), split_part(u.email, '@', 1)) AS author,
                   i.rating, i.comment, i.created_at
            FROM inserted i
            JOIN storefront.user u ON u.id = i.user_id
            ",
        )
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(review.comment.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
    async fn count_reviews_by_user(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storefront.review WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
