//! Order history.
//!
//! The payment provider is the system of record for orders. A user's
//! provider customer is found by external ID (our user ID); that mapping is
//! cached in-process for 5 minutes. Order lists themselves are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::instrument;

use emporium_core::UserId;

use crate::models::CurrentUser;
use crate::polar::{PaymentError, PaymentProvider, ProviderOrder};

use super::ShopError;

/// Reads a user's orders from the payment provider.
#[derive(Clone)]
pub struct OrderService {
    payments: Arc<dyn PaymentProvider>,
    customer_ids: Cache<UserId, String>,
}

impl OrderService {
    /// Create an order service with an empty customer cache.
    #[must_use]
    pub fn new(payments: Arc<dyn PaymentProvider>) -> Self {
        let customer_ids = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self {
            payments,
            customer_ids,
        }
    }

    /// Orders of the user, newest first, amounts in minor units.
    ///
    /// A user who never checked out has no provider customer and therefore
    /// no orders.
    ///
    /// # Errors
    ///
    /// Returns `Provider` if the provider cannot be reached or rejects the call.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn orders_for(&self, user: &CurrentUser) -> Result<Vec<ProviderOrder>, ShopError> {
        let Some(customer_id) = self.customer_id(user.id).await? else {
            return Ok(Vec::new());
        };
        let orders = self.payments.list_orders(&customer_id).await?;
        tracing::debug!(count = orders.len(), "Loaded orders");
        Ok(orders)
    }

    async fn customer_id(&self, user_id: UserId) -> Result<Option<String>, ShopError> {
        if let Some(id) = self.customer_ids.get(&user_id).await {
            return Ok(Some(id));
        }

        match self
            .payments
            .customer_by_external_id(&user_id.to_string())
            .await
        {
            Ok(customer) => {
                self.customer_ids.insert(user_id, customer.id.clone()).await;
                Ok(Some(customer.id))
            }
            Err(PaymentError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use emporium_core::{Email, Role};

    use super::*;
    use crate::polar::testing::FakePolar;

    fn user(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("buyer@example.com").unwrap(),
            name: String::new(),
            role: Role::Customer,
        }
    }

    fn order(id: &str, total: i64) -> ProviderOrder {
        ProviderOrder {
            id: id.to_string(),
            created_at: Utc::now(),
            status: "paid".to_string(),
            total_amount: total,
            currency: "usd".to_string(),
            product: None,
            items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_unknown_customer_has_no_orders() {
        let provider = Arc::new(FakePolar::default());
        let orders = OrderService::new(provider.clone());

        assert!(orders.orders_for(&user(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orders_are_returned_verbatim() {
        let provider = Arc::new(FakePolar::default());
        provider.add_customer("1", "cus_1", vec![order("ord_1", 2_000), order("ord_2", 599)]);
        let orders = OrderService::new(provider.clone());

        let list = orders.orders_for(&user(1)).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "ord_1");
        assert_eq!(list[0].total_amount, 2_000);
        assert_eq!(list[1].total_amount, 599);
    }

    #[tokio::test]
    async fn test_customer_lookup_is_cached_but_orders_are_not() {
        let provider = Arc::new(FakePolar::default());
        provider.add_customer("1", "cus_1", vec![order("ord_1", 100)]);
        let orders = OrderService::new(provider.clone());

        orders.orders_for(&user(1)).await.unwrap();
        provider.add_customer("1", "cus_1", vec![order("ord_1", 100), order("ord_2", 200)]);
        let list = orders.orders_for(&user(1)).await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(provider.customer_lookups(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_an_error() {
        let provider = Arc::new(FakePolar::failing());
        let orders = OrderService::new(provider.clone());

        let err = orders.orders_for(&user(1)).await.unwrap_err();
        assert!(matches!(err, ShopError::Provider(_)));
    }
}
