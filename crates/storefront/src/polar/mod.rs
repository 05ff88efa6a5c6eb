//! Payment provider integration (Polar).
//!
//! Polar hosts checkout and owns orders. The storefront talks to it
//! through the [`PaymentProvider`] trait so tests can substitute a fake.
//!
//! # Endpoints used
//!
//! ```text
//! POST /v1/products/                      - Create a product with a fixed price
//! POST /v1/checkouts/                     - Create a hosted checkout session
//! GET  /v1/customers/external/{id}        - Customer by our user ID
//! GET  /v1/orders/?customer_id={id}       - Orders of a customer
//! ```

mod client;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::PolarClient;
pub use types::{
    CheckoutSession, CreateCheckout, CreatePrice, CreateProduct, Customer, PolarProduct,
    ProviderOrder,
};

/// Errors that can occur when interacting with the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The requested resource does not exist at the provider.
    #[error("not found")]
    NotFound,

    /// Failed to parse response or build a request.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Operations the storefront needs from a payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a product with a one-time price.
    async fn create_product(&self, product: &CreateProduct) -> Result<PolarProduct, PaymentError>;

    /// Create a hosted checkout session.
    async fn create_checkout(
        &self,
        checkout: &CreateCheckout,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Look up a customer by our external ID.
    ///
    /// Returns [`PaymentError::NotFound`] when no customer has that ID.
    async fn customer_by_external_id(&self, external_id: &str) -> Result<Customer, PaymentError>;

    /// List the orders of a customer, newest first.
    async fn list_orders(&self, customer_id: &str) -> Result<Vec<ProviderOrder>, PaymentError>;
}
