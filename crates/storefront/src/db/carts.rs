//! Cart queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use emporium_core::{CartId, CartItemId, ProductId, UserId};

use super::products::ProductRow;
use super::{CartStore, PgStore, RepositoryError};
use crate::models::{Cart, CartItem, CartLine, Product};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    checkout_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            checkout_session_id: row.checkout_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        if row.quantity <= 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "cart item {} has non-positive quantity {}",
                row.id, row.quantity
            )));
        }
        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: row.quantity,
        })
    }
}

/// A cart item row joined with its product.
#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: CartItemId,
    cart_id: CartId,
    quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let product = Product::try_from(row.product)?;
        let item = CartItem::try_from(CartItemRow {
            id: row.item_id,
            cart_id: row.cart_id,
            product_id: product.id,
            quantity: row.quantity,
        })?;
        Ok(Self { item, product })
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO storefront.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, checkout_session_id, created_at, updated_at
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, checkout_session_id, created_at, updated_at
            FROM storefront.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, cart_id, product_id, quantity
            FROM storefront.cart_item
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartItem::try_from).transpose()
    }

    async fn add_item_guarded(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        // The SELECT yields no row unless the product has enough stock, in
        // which case nothing is inserted or updated.
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
            SELECT $1, p.id, $3
            FROM storefront.product p
            WHERE p.id = $2 AND p.inventory >= $3
            ON CONFLICT (cart_id, product_id) DO UPDATE
                SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                    updated_at = NOW()
            RETURNING id, cart_id, product_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_on_overflow)?;

        if row.is_some() {
            touch_cart(self, cart_id).await?;
        }
        row.map(CartItem::try_from).transpose()
    }

    async fn set_item_quantity_guarded(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            UPDATE storefront.cart_item ci
            SET quantity = $3, updated_at = NOW()
            FROM storefront.product p
            WHERE ci.cart_id = $1
              AND ci.product_id = $2
              AND p.id = ci.product_id
              AND p.inventory >= $3
            RETURNING ci.id, ci.cart_id, ci.product_id, ci.quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            touch_cart(self, cart_id).await?;
        }
        row.map(CartItem::try_from).transpose()
    }

    async fn delete_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.cart_item WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_items(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn load_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.id AS item_id, ci.cart_id, ci.quantity,
                   p.id, p.name, p.description, p.price, p.sku, p.inventory,
                   p.is_active, p.images, p.polar_product_id, p.created_at, p.updated_at
            FROM storefront.cart_item ci
            JOIN storefront.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn set_checkout_session(
        &self,
        cart_id: CartId,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.cart
            SET checkout_session_id = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(cart_id)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Bump the cart's `updated_at` after an item change.
async fn touch_cart(store: &PgStore, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE storefront.cart SET updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(&store.pool)
        .await?;
    Ok(())
}

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Map an accumulated quantity beyond `INTEGER` to [`RepositoryError::Conflict`].
fn conflict_on_overflow(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
    {
        return RepositoryError::Conflict("cart item quantity out of range".to_string());
    }
    RepositoryError::Database(e)
}
