//! Shop error taxonomy and the uniform action result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::polar::PaymentError;

/// Errors returned by the cart, checkout, order and catalog services.
#[derive(Debug, Error)]
pub enum ShopError {
    /// The named entity does not exist (or is not visible to the caller).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Not enough stock for the requested quantity.
    #[error("only {available} in stock (requested {requested})")]
    InsufficientInventory { available: i32, requested: i32 },

    /// The user has never had a cart.
    #[error("no cart found")]
    NoCartFound,

    /// The cart has no items that can be checked out.
    #[error("cart is empty")]
    EmptyCart,

    /// The cart holds more distinct products than one hosted checkout can
    /// charge for.
    #[error("cart has {products} products; checkout takes one")]
    MixedCart { products: usize },

    /// The caller is not signed in.
    #[error("authentication required")]
    Unauthenticated,

    /// The payment provider call failed.
    #[error("payment provider error: {0}")]
    Provider(#[from] PaymentError),

    /// Another product already uses this SKU.
    #[error("SKU {0} already exists")]
    DuplicateSku(String),

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Store operation failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ShopError {
    /// Message safe to show to the user. Internal failures get a generic text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(what) => format!("{} not found", capitalize(what)),
            Self::InsufficientInventory { available, .. } => {
                format!("Not enough inventory. Only {available} available.")
            }
            Self::NoCartFound => "No cart found".to_string(),
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::MixedCart { .. } => {
                "Checkout takes one product at a time. Remove the other products from your cart to continue.".to_string()
            }
            Self::Unauthenticated => "Please sign in to continue".to_string(),
            Self::DuplicateSku(sku) => format!("A product with SKU {sku} already exists"),
            Self::Validation(message) => message.clone(),
            Self::Provider(_) | Self::Repository(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Whether this is a server-side failure worth reporting.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Repository(_))
    }
}

pub(super) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Uniform JSON result of a user action.
///
/// Domain failures are reported here with `success: false` instead of an
/// HTTP error status, so the client can show the message and roll back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResult {
    /// Successful result without a message.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Successful result with a message.
    #[must_use]
    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// Failed result with a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl From<&ShopError> for ActionResult {
    fn from(err: &ShopError) -> Self {
        if err.is_internal() {
            tracing::error!(error = %err, "Shop action failed");
        }
        Self::failure(err.user_message())
    }
}

impl<T> From<Result<T, ShopError>> for ActionResult {
    fn from(result: Result<T, ShopError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(err) => Self::from(&err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ShopError::Repository(RepositoryError::DataCorruption(
            "cart item 4 has quantity 0".to_string(),
        ));
        let result = ActionResult::from(&err);
        assert!(!result.success);
        assert!(!result.message.unwrap().contains("cart item"));
    }

    #[test]
    fn test_domain_errors_explain_themselves() {
        let err = ShopError::InsufficientInventory {
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.user_message(),
            "Not enough inventory. Only 2 available."
        );
        assert_eq!(ShopError::NotFound("product").user_message(), "Product not found");
        assert!(
            ShopError::MixedCart { products: 2 }
                .user_message()
                .starts_with("Checkout takes one product at a time")
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&ActionResult::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let json = serde_json::to_string(&ActionResult::failure("Nope")).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"Nope"}"#);
    }
}
