//! Store doubles for tests.

use async_trait::async_trait;

use emporium_core::{CartId, ProductId, UserId};

use super::{CartStore, RepositoryError};
use crate::models::{Cart, CartItem, CartLine};

/// Cart store whose every call fails, as when the database is unreachable.
#[derive(Debug, Default)]
pub struct UnavailableCarts;

fn unavailable() -> RepositoryError {
    RepositoryError::DataCorruption("cart store unavailable".to_string())
}

#[async_trait]
impl CartStore for UnavailableCarts {
    async fn get_or_create_cart(&self, _: UserId) -> Result<Cart, RepositoryError> {
        Err(unavailable())
    }

    async fn find_cart_by_user(&self, _: UserId) -> Result<Option<Cart>, RepositoryError> {
        Err(unavailable())
    }

    async fn find_item(&self, _: CartId, _: ProductId) -> Result<Option<CartItem>, RepositoryError> {
        Err(unavailable())
    }

    async fn add_item_guarded(
        &self,
        _: CartId,
        _: ProductId,
        _: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        Err(unavailable())
    }

    async fn set_item_quantity_guarded(
        &self,
        _: CartId,
        _: ProductId,
        _: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        Err(unavailable())
    }

    async fn delete_item(&self, _: CartId, _: ProductId) -> Result<bool, RepositoryError> {
        Err(unavailable())
    }

    async fn clear_items(&self, _: CartId) -> Result<u64, RepositoryError> {
        Err(unavailable())
    }

    async fn load_lines(&self, _: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        Err(unavailable())
    }

    async fn set_checkout_session(&self, _: CartId, _: &str) -> Result<(), RepositoryError> {
        Err(unavailable())
    }
}
