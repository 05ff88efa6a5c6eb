//! Polar API request and response types.
//!
//! Only the fields the storefront reads are modeled; everything else in
//! the responses is ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Products
// =============================================================================

/// Body of `POST /v1/products/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub prices: Vec<CreatePrice>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// A one-time fixed price, in minor units.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePrice {
    pub amount_type: &'static str,
    pub price_amount: i64,
    pub price_currency: String,
}

impl CreatePrice {
    /// Fixed price of `amount` minor units in `currency` (lowercase ISO code).
    #[must_use]
    pub fn fixed(amount: i64, currency: &str) -> Self {
        Self {
            amount_type: "fixed",
            price_amount: amount,
            price_currency: currency.to_owned(),
        }
    }
}

/// A product as returned by Polar.
#[derive(Debug, Clone, Deserialize)]
pub struct PolarProduct {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Checkouts
// =============================================================================

/// Body of `POST /v1/checkouts/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCheckout {
    /// Polar product IDs offered in the checkout.
    pub products: Vec<String>,
    /// Ad-hoc prices per product ID, overriding the catalog price.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub prices: BTreeMap<String, Vec<CreatePrice>>,
    /// Where Polar redirects after payment. `{CHECKOUT_ID}` is substituted.
    pub success_url: String,
    /// Where the "back" link of the hosted checkout points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Our user ID; links the Polar customer to the local account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_customer_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// A hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted checkout page to redirect the buyer to.
    pub url: String,
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Customers & Orders
// =============================================================================

/// A Polar customer.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// An order as reported by Polar. Amounts are in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub total_amount: i64,
    pub currency: String,
    #[serde(default)]
    pub product: Option<OrderProduct>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Product summary embedded in an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProduct {
    pub id: String,
    pub name: String,
}

/// A line of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub label: String,
    pub amount: i64,
}

/// Paginated list envelope used by Polar list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResource<T> {
    pub items: Vec<T>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_body_omits_empty_fields() {
        let body = CreateCheckout {
            products: vec!["prod_1".to_string()],
            prices: BTreeMap::new(),
            success_url: "https://shop.test/checkout/success?checkout_id={CHECKOUT_ID}".to_string(),
            return_url: None,
            customer_email: Some("a@b.co".to_string()),
            customer_name: None,
            external_customer_id: Some("5".to_string()),
            metadata: BTreeMap::new(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["products"][0], "prod_1");
        assert_eq!(json["external_customer_id"], "5");
        assert!(json.get("return_url").is_none());
        assert!(json.get("customer_name").is_none());
        assert!(json.get("metadata").is_none());
        assert!(json.get("prices").is_none());
    }

    #[test]
    fn test_checkout_body_carries_ad_hoc_prices() {
        let body = CreateCheckout {
            products: vec!["prod_1".to_string()],
            prices: BTreeMap::from([(
                "prod_1".to_string(),
                vec![CreatePrice::fixed(4_500, "usd")],
            )]),
            success_url: "https://shop.test/checkout/success".to_string(),
            return_url: None,
            customer_email: None,
            customer_name: None,
            external_customer_id: None,
            metadata: BTreeMap::new(),
        };

        let json = serde_json::to_value(&body).unwrap();
        let price = &json["prices"]["prod_1"][0];
        assert_eq!(price["amount_type"], "fixed");
        assert_eq!(price["price_amount"], 4_500);
        assert_eq!(price["price_currency"], "usd");
    }

    #[test]
    fn test_order_list_parses_with_missing_optional_fields() {
        let json = r#"{
            "items": [
                {
                    "id": "ord_1",
                    "created_at": "2025-03-01T12:00:00Z",
                    "status": "paid",
                    "total_amount": 4999,
                    "currency": "usd",
                    "customer_id": "cus_1",
                    "product": { "id": "prod_1", "name": "Desk Lamp", "is_archived": false }
                }
            ],
            "pagination": { "total_count": 1, "max_page": 1 }
        }"#;

        let list: ListResource<ProviderOrder> = serde_json::from_str(json).unwrap();
        assert_eq!(list.items.len(), 1);
        let order = &list.items[0];
        assert_eq!(order.total_amount, 4999);
        assert_eq!(order.product.as_ref().unwrap().name, "Desk Lamp");
        assert!(order.items.is_empty());
    }
}
