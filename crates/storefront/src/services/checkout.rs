//! Checkout orchestration.
//!
//! Turns the caller's cart into a hosted checkout session at the payment
//! provider. The provider owns payment and orders from there on; there is
//! no webhook, so the cart is only cleared when the buyer lands on the
//! success page.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use emporium_core::{CurrencyCode, Money};

use crate::db::CartStore;
use crate::models::{CartLine, CurrentUser};
use crate::polar::{CreateCheckout, CreatePrice, PaymentProvider};

use super::ShopError;

/// Currency of every checkout; catalog prices are stored in dollars.
const CHECKOUT_CURRENCY: CurrencyCode = CurrencyCode::USD;

/// Where to send the buyer to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRedirect {
    pub checkout_url: String,
    pub session_id: String,
}

/// Creates hosted checkout sessions from carts.
#[derive(Clone)]
pub struct CheckoutService {
    carts: Arc<dyn CartStore>,
    payments: Arc<dyn PaymentProvider>,
    base_url: String,
}

impl CheckoutService {
    /// `base_url` is the public origin used for the return links, without a
    /// trailing slash.
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartStore>,
        payments: Arc<dyn PaymentProvider>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            carts,
            payments,
            base_url: base_url.into(),
        }
    }

    /// Create a checkout session for everything in the user's cart.
    ///
    /// The hosted checkout charges for a single product, so the line's
    /// quantity is carried as an ad-hoc price of unit price times quantity.
    /// The cart is not modified apart from remembering the session ID.
    ///
    /// # Errors
    ///
    /// - `NoCartFound` if the user has no cart
    /// - `EmptyCart` if no item in the cart can be sold through the provider
    /// - `MixedCart` if more than one product can be sold through the provider
    /// - `Provider` if the provider rejects the request
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_checkout_session(
        &self,
        user: &CurrentUser,
    ) -> Result<CheckoutRedirect, ShopError> {
        let cart = self
            .carts
            .find_cart_by_user(user.id)
            .await?
            .ok_or(ShopError::NoCartFound)?;
        let lines = self.carts.load_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let mapped = provider_lines(&lines);
        if mapped.len() < lines.len() {
            tracing::warn!(
                cart_id = %cart.id,
                skipped = lines.len() - mapped.len(),
                "Cart contains products without a provider ID"
            );
        }
        let line = match mapped.as_slice() {
            [] => return Err(ShopError::EmptyCart),
            [line] => *line,
            several => return Err(ShopError::MixedCart { products: several.len() }),
        };
        let amount = line_amount(&line).ok_or_else(|| {
            ShopError::Validation("Order total is too large".to_string())
        })?;

        let mut metadata = BTreeMap::new();
        metadata.insert("cart_id".to_owned(), cart.id.to_string());
        metadata.insert("quantities".to_owned(), encode_quantities(&mapped));

        let request = CreateCheckout {
            products: vec![line.provider_id.to_owned()],
            prices: BTreeMap::from([(
                line.provider_id.to_owned(),
                vec![CreatePrice::fixed(amount, CHECKOUT_CURRENCY.code())],
            )]),
            success_url: format!(
                "{}/checkout/success?checkout_id={{CHECKOUT_ID}}",
                self.base_url
            ),
            return_url: Some(format!("{}/checkout/canceled", self.base_url)),
            customer_email: Some(user.email.to_string()),
            customer_name: Some(user.name.trim().to_owned()).filter(|n| !n.is_empty()),
            external_customer_id: Some(user.id.to_string()),
            metadata,
        };

        let session = self
            .payments
            .create_checkout(&request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to create checkout session"))?;

        self.carts.set_checkout_session(cart.id, &session.id).await?;
        tracing::info!(session_id = %session.id, "Checkout session created");

        Ok(CheckoutRedirect {
            checkout_url: session.url,
            session_id: session.id,
        })
    }

    /// Clear the user's cart after the provider reported a successful checkout.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn complete(&self, user: &CurrentUser) -> Result<(), ShopError> {
        if let Some(cart) = self.carts.find_cart_by_user(user.id).await? {
            self.carts.clear_items(cart.id).await?;
        }
        Ok(())
    }
}

/// A cart line whose product is sold through the provider.
#[derive(Debug, Clone, Copy)]
struct ProviderLine<'a> {
    provider_id: &'a str,
    quantity: i32,
    unit_price: Decimal,
}

/// Every line whose product is mapped to a provider product.
fn provider_lines(lines: &[CartLine]) -> Vec<ProviderLine<'_>> {
    lines
        .iter()
        .filter_map(|line| {
            line.product
                .polar_product_id
                .as_deref()
                .map(|provider_id| ProviderLine {
                    provider_id,
                    quantity: line.item.quantity,
                    unit_price: line.product.price,
                })
        })
        .collect()
}

/// Price of the whole line in minor units, or `None` if it does not fit.
fn line_amount(line: &ProviderLine<'_>) -> Option<i64> {
    let total = line.unit_price.checked_mul(Decimal::from(line.quantity))?;
    Money::new(total, CHECKOUT_CURRENCY).to_minor_units()
}

/// `polarId:qty` pairs joined with commas.
fn encode_quantities(lines: &[ProviderLine<'_>]) -> String {
    lines
        .iter()
        .map(|line| format!("{}:{}", line.provider_id, line.quantity))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::{Email, Role, UserId};

    use super::*;
    use crate::db::Stores;
    use crate::models::NewProduct;
    use crate::polar::testing::FakePolar;
    use crate::services::{CartContext, CartService};

    fn shopper() -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            email: Email::parse("shopper@example.com").unwrap(),
            name: "Sam Shopper".to_string(),
            role: Role::Customer,
        }
    }

    async fn product(stores: &Stores, sku: &str, provider_id: Option<&str>) -> emporium_core::ProductId {
        let product = stores
            .catalog
            .create_product(&NewProduct {
                name: format!("Item {sku}"),
                description: String::new(),
                price: Decimal::new(1500, 2),
                sku: sku.to_string(),
                inventory: 10,
                images: Vec::new(),
                category_ids: Vec::new(),
            })
            .await
            .unwrap();
        if let Some(id) = provider_id {
            stores.catalog.set_provider_id(product.id, id).await.unwrap();
        }
        product.id
    }

    fn checkout(stores: &Stores, provider: &Arc<FakePolar>) -> CheckoutService {
        CheckoutService::new(
            Arc::clone(&stores.carts),
            provider.clone(),
            "https://shop.example.com",
        )
    }

    #[tokio::test]
    async fn test_no_cart_and_empty_cart_skip_the_provider() {
        let stores = Stores::memory();
        let provider = Arc::new(FakePolar::default());
        let service = checkout(&stores, &provider);
        let user = shopper();

        let err = service.create_checkout_session(&user).await.unwrap_err();
        assert!(matches!(err, ShopError::NoCartFound));

        stores.carts.get_or_create_cart(user.id).await.unwrap();
        let err = service.create_checkout_session(&user).await.unwrap_err();
        assert!(matches!(err, ShopError::EmptyCart));

        assert!(provider.checkouts().is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_products_are_left_out() {
        let stores = Stores::memory();
        let provider = Arc::new(FakePolar::default());
        let service = checkout(&stores, &provider);
        let user = shopper();
        let cart = CartService::new(&stores);
        let ctx = CartContext::for_user(&user);

        let local_only = product(&stores, "LOCAL", None).await;
        cart.add_item(&ctx, local_only, 1).await.unwrap();
        let err = service.create_checkout_session(&user).await.unwrap_err();
        assert!(matches!(err, ShopError::EmptyCart));

        let mapped = product(&stores, "MAPPED", Some("polar_mapped")).await;
        cart.add_item(&ctx, mapped, 3).await.unwrap();
        let redirect = service.create_checkout_session(&user).await.unwrap();

        let sent = provider.checkouts();
        assert_eq!(sent.len(), 1);
        let request = &sent[0];
        assert_eq!(request.products, vec!["polar_mapped".to_string()]);
        assert_eq!(request.prices["polar_mapped"][0].price_amount, 4_500);
        assert_eq!(request.metadata["quantities"], "polar_mapped:3");
        assert_eq!(
            request.success_url,
            "https://shop.example.com/checkout/success?checkout_id={CHECKOUT_ID}"
        );
        assert_eq!(
            request.return_url.as_deref(),
            Some("https://shop.example.com/checkout/canceled")
        );
        assert_eq!(request.customer_email.as_deref(), Some("shopper@example.com"));
        assert_eq!(request.customer_name.as_deref(), Some("Sam Shopper"));
        assert_eq!(request.external_customer_id.as_deref(), Some("7"));

        let stored = stores.carts.find_cart_by_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.checkout_session_id.as_deref(), Some(redirect.session_id.as_str()));
        assert_eq!(request.metadata["cart_id"], stored.id.to_string());
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_cart_untouched() {
        let stores = Stores::memory();
        let provider = Arc::new(FakePolar::failing());
        let service = checkout(&stores, &provider);
        let user = shopper();
        let cart = CartService::new(&stores);
        let ctx = CartContext::for_user(&user);

        let id = product(&stores, "MAPPED", Some("polar_1")).await;
        cart.add_item(&ctx, id, 2).await.unwrap();

        let err = service.create_checkout_session(&user).await.unwrap_err();
        assert!(matches!(err, ShopError::Provider(_)));
        assert_eq!(cart.count(&ctx).await.unwrap(), 2);
        let stored = stores.carts.find_cart_by_user(user.id).await.unwrap().unwrap();
        assert!(stored.checkout_session_id.is_none());
    }

    #[tokio::test]
    async fn test_complete_clears_the_cart() {
        let stores = Stores::memory();
        let provider = Arc::new(FakePolar::default());
        let service = checkout(&stores, &provider);
        let user = shopper();
        let cart = CartService::new(&stores);
        let ctx = CartContext::for_user(&user);

        let id = product(&stores, "MAPPED", Some("polar_1")).await;
        cart.add_item(&ctx, id, 2).await.unwrap();
        service.complete(&user).await.unwrap();
        assert_eq!(cart.count(&ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_several_provider_products_are_refused() {
        let stores = Stores::memory();
        let provider = Arc::new(FakePolar::default());
        let service = checkout(&stores, &provider);
        let user = shopper();
        let cart = CartService::new(&stores);
        let ctx = CartContext::for_user(&user);

        let lamp = product(&stores, "LAMP", Some("polar_lamp")).await;
        let shade = product(&stores, "SHADE", Some("polar_shade")).await;
        cart.add_item(&ctx, lamp, 3).await.unwrap();
        cart.add_item(&ctx, shade, 1).await.unwrap();

        let err = service.create_checkout_session(&user).await.unwrap_err();
        assert!(matches!(err, ShopError::MixedCart { products: 2 }));
        assert!(provider.checkouts().is_empty());
        assert_eq!(cart.count(&ctx).await.unwrap(), 4);

        // Down to one product, the quantity is charged in full
        cart.remove_item(&ctx, shade).await.unwrap();
        service.create_checkout_session(&user).await.unwrap();
        let sent = provider.checkouts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].products, vec!["polar_lamp".to_string()]);
        let price = &sent[0].prices["polar_lamp"][0];
        assert_eq!(price.price_amount, 4_500);
        assert_eq!(price.price_currency, "usd");
    }

    #[test]
    fn test_line_amount_in_minor_units() {
        let line = ProviderLine {
            provider_id: "a",
            quantity: 3,
            unit_price: Decimal::new(1999, 2),
        };
        assert_eq!(line_amount(&line), Some(5_997));

        let huge = ProviderLine {
            quantity: i32::MAX,
            unit_price: Decimal::new(99_999_999_999, 2),
            ..line
        };
        assert_eq!(line_amount(&huge), None);
    }

    #[test]
    fn test_quantity_metadata_format() {
        let line = |provider_id, quantity| ProviderLine {
            provider_id,
            quantity,
            unit_price: Decimal::ONE,
        };
        assert_eq!(encode_quantities(&[line("a", 1), line("b", 12)]), "a:1,b:12");
        assert_eq!(encode_quantities(&[]), "");
    }
}
