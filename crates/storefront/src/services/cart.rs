//! Cart manager.
//!
//! Every operation takes an explicit [`CartContext`] naming the cart owner.
//! Stock is checked up front for a precise error message and again by the
//! guarded store write, which refuses to apply when stock has dropped in
//! between. Stock is checked, not reserved: two carts may each hold the
//! last unit until checkout.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;

use emporium_core::{CartId, ProductId, UserId};

use super::ShopError;
use crate::db::{CartStore, CatalogStore, RepositoryError, Stores};
use crate::models::{CartItem, CartLine, CurrentUser, Product};

/// Whose cart an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartContext {
    pub user_id: UserId,
}

impl CartContext {
    /// Context for a signed-in user.
    #[must_use]
    pub const fn for_user(user: &CurrentUser) -> Self {
        Self { user_id: user.id }
    }

    /// Context for an optional user.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Unauthenticated` when there is no user.
    pub fn require(user: Option<&CurrentUser>) -> Result<Self, ShopError> {
        user.map(Self::for_user).ok_or(ShopError::Unauthenticated)
    }
}

/// Cart with its lines and totals.
#[derive(Debug, Clone)]
pub struct CartContents {
    /// False when the cart could not be loaded; the rest is then empty.
    pub success: bool,
    pub message: Option<String>,
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLine>,
    /// Sum of item quantities.
    pub total_items: i64,
    /// Sum of unit price times quantity.
    pub total_price: Decimal,
}

impl CartContents {
    fn from_lines(cart_id: CartId, lines: Vec<CartLine>) -> Self {
        let total_items = lines.iter().map(|l| i64::from(l.item.quantity)).sum();
        let total_price = lines.iter().map(CartLine::line_total).sum();
        Self {
            success: true,
            message: None,
            cart_id: Some(cart_id),
            lines,
            total_items,
            total_price,
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_owned()),
            cart_id: None,
            lines: Vec::new(),
            total_items: 0,
            total_price: Decimal::ZERO,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cart operations for one user at a time.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CartService {
    /// Create a cart service over the given stores.
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            carts: Arc::clone(&stores.carts),
            catalog: Arc::clone(&stores.catalog),
        }
    }

    /// Add `quantity` units of a product, accumulating onto an existing line.
    ///
    /// # Errors
    ///
    /// - `Validation` if `quantity` is not positive
    /// - `NotFound` if the product does not exist or is inactive
    /// - `InsufficientInventory` if stock is below `quantity`
    /// - `Validation` if the accumulated quantity would overflow
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        ctx: &CartContext,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, ShopError> {
        if quantity <= 0 {
            return Err(ShopError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let cart = self.carts.get_or_create_cart(ctx.user_id).await?;
        let product = self.visible_product(product_id).await?;
        ensure_stock(&product, quantity)?;

        let added = self
            .carts
            .add_item_guarded(cart.id, product_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    ShopError::Validation("Quantity is too large".to_string())
                }
                other => other.into(),
            })?;
        if let Some(item) = added {
            return Ok(item);
        }

        // Stock changed between the check and the write.
        let product = self.visible_product(product_id).await?;
        ensure_stock(&product, quantity)?;
        Err(ShopError::InsufficientInventory {
            available: product.inventory,
            requested: quantity,
        })
    }

    /// Set the quantity of a line. Zero or less removes it (`Ok(None)`).
    ///
    /// # Errors
    ///
    /// - `NotFound` if the product is not in the cart
    /// - `InsufficientInventory` if stock is below `quantity`
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        ctx: &CartContext,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, ShopError> {
        if quantity <= 0 {
            self.remove_item(ctx, product_id).await?;
            return Ok(None);
        }

        let cart = self
            .carts
            .find_cart_by_user(ctx.user_id)
            .await?
            .ok_or(ShopError::NotFound("cart item"))?;
        if self.carts.find_item(cart.id, product_id).await?.is_none() {
            return Err(ShopError::NotFound("cart item"));
        }

        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(ShopError::NotFound("product"))?;
        ensure_stock(&product, quantity)?;

        if let Some(item) = self
            .carts
            .set_item_quantity_guarded(cart.id, product_id, quantity)
            .await?
        {
            return Ok(Some(item));
        }

        // The guarded write refused: either the line vanished or stock dropped.
        if self.carts.find_item(cart.id, product_id).await?.is_none() {
            return Err(ShopError::NotFound("cart item"));
        }
        let available = self
            .catalog
            .get_product(product_id)
            .await?
            .map_or(0, |p| p.inventory);
        Err(ShopError::InsufficientInventory {
            available,
            requested: quantity,
        })
    }

    /// Remove a product from the cart. Removing an absent product succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        ctx: &CartContext,
        product_id: ProductId,
    ) -> Result<(), ShopError> {
        if let Some(cart) = self.carts.find_cart_by_user(ctx.user_id).await? {
            let removed = self.carts.delete_item(cart.id, product_id).await?;
            tracing::debug!(removed, "Cart item removal");
        }
        Ok(())
    }

    /// Remove every item from the cart. The cart itself is kept.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, ctx: &CartContext) -> Result<(), ShopError> {
        if let Some(cart) = self.carts.find_cart_by_user(ctx.user_id).await? {
            let removed = self.carts.clear_items(cart.id).await?;
            tracing::debug!(removed, "Cart cleared");
        }
        Ok(())
    }

    /// Load the cart with its lines and totals.
    ///
    /// Never fails: a load error is logged and reported as an empty result
    /// with `success == false`.
    #[instrument(skip(self))]
    pub async fn contents(&self, ctx: &CartContext) -> CartContents {
        match self.load_contents(ctx).await {
            Ok(contents) => contents,
            Err(e) => {
                tracing::error!(error = %e, user_id = %ctx.user_id, "Failed to load cart");
                CartContents::failed("Failed to load cart")
            }
        }
    }

    /// Total number of units in the cart, for the header badge.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn count(&self, ctx: &CartContext) -> Result<i64, ShopError> {
        let Some(cart) = self.carts.find_cart_by_user(ctx.user_id).await? else {
            return Ok(0);
        };
        let lines = self.carts.load_lines(cart.id).await?;
        Ok(lines.iter().map(|l| i64::from(l.item.quantity)).sum())
    }

    async fn load_contents(&self, ctx: &CartContext) -> Result<CartContents, ShopError> {
        let cart = self.carts.get_or_create_cart(ctx.user_id).await?;
        let lines = self.carts.load_lines(cart.id).await?;
        Ok(CartContents::from_lines(cart.id, lines))
    }

    async fn visible_product(&self, product_id: ProductId) -> Result<Product, ShopError> {
        self.catalog
            .get_product(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ShopError::NotFound("product"))
    }
}

fn ensure_stock(product: &Product, quantity: i32) -> Result<(), ShopError> {
    if product.has_stock_for(quantity) {
        Ok(())
    } else {
        Err(ShopError::InsufficientInventory {
            available: product.inventory,
            requested: quantity,
        })
    }
}
