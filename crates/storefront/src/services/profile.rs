//! The signed-in user's account overview.
//!
//! Built from local records only: recent orders with their lines, order
//! count, spend and reviews written. Orders placed through hosted checkout
//! live at the payment provider and are shown by [`super::orders`].

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;

use crate::db::{CatalogStore, OrderStore, Stores, UserStore};
use crate::models::{CurrentUser, OrderDetail, User};

use super::ShopError;

/// Orders shown on the account page.
pub const RECENT_ORDERS: u32 = 5;

/// Everything the account page shows.
#[derive(Debug, Clone)]
pub struct AccountOverview {
    pub user: User,
    /// Newest first, at most [`RECENT_ORDERS`].
    pub recent_orders: Vec<OrderDetail>,
    pub order_count: i64,
    /// Spend over every order that was not cancelled.
    pub total_spend: Decimal,
    pub review_count: i64,
}

/// Reads account overviews.
#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
}

impl ProfileService {
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            users: Arc::clone(&stores.users),
            catalog: Arc::clone(&stores.catalog),
            orders: Arc::clone(&stores.orders),
        }
    }

    /// Overview for the signed-in user.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the account was deleted after sign-in
    /// - `Repository` if a store fails
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn overview(&self, user: &CurrentUser) -> Result<AccountOverview, ShopError> {
        let account = self
            .users
            .get_by_id(user.id)
            .await?
            .ok_or(ShopError::NotFound("user"))?;
        let recent_orders = self.orders.recent_orders(user.id, RECENT_ORDERS).await?;
        let totals = self.orders.order_totals(user.id).await?;
        let review_count = self.catalog.count_reviews_by_user(user.id).await?;

        Ok(AccountOverview {
            user: account,
            recent_orders,
            order_count: totals.order_count,
            total_spend: totals.total_spend,
            review_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::{CategoryId, Email, OrderStatus, Role, UserId};

    use super::*;
    use crate::models::{NewOrder, NewOrderItem, NewProduct, NewReview, NewUser};

    async fn setup() -> (ProfileService, Stores, CurrentUser) {
        let stores = Stores::memory();
        let user = stores
            .users
            .create_with_password(
                &NewUser {
                    email: Email::parse("ada@example.com").unwrap(),
                    name: "Ada".to_string(),
                    role: Role::Customer,
                },
                "hash",
            )
            .await
            .unwrap();
        let current = CurrentUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        };
        (ProfileService::new(&stores), stores, current)
    }

    #[tokio::test]
    async fn test_new_account_is_empty() {
        let (profile, _, user) = setup().await;
        let overview = profile.overview(&user).await.unwrap();
        assert_eq!(overview.user.email.as_str(), "ada@example.com");
        assert!(overview.recent_orders.is_empty());
        assert_eq!(overview.order_count, 0);
        assert_eq!(overview.total_spend, Decimal::ZERO);
        assert_eq!(overview.review_count, 0);
    }

    #[tokio::test]
    async fn test_overview_caps_recent_orders_and_counts_all() {
        let (profile, stores, user) = setup().await;
        let lamp = stores
            .catalog
            .create_product(&NewProduct {
                name: "Desk Lamp".to_string(),
                description: String::new(),
                price: Decimal::new(1_000, 2),
                sku: "LAMP".to_string(),
                inventory: 5,
                images: Vec::new(),
                category_ids: vec![CategoryId::new(1)],
            })
            .await
            .unwrap();
        for _ in 0..6 {
            stores
                .orders
                .create_order(&NewOrder {
                    user_id: user.id,
                    status: OrderStatus::Delivered,
                    items: vec![NewOrderItem {
                        product_id: lamp.id,
                        quantity: 2,
                        price: lamp.price,
                    }],
                })
                .await
                .unwrap();
        }
        stores
            .catalog
            .create_review(&NewReview {
                product_id: lamp.id,
                user_id: user.id,
                rating: 5,
                comment: None,
            })
            .await
            .unwrap();

        let overview = profile.overview(&user).await.unwrap();
        assert_eq!(
            overview.recent_orders.len(),
            usize::try_from(RECENT_ORDERS).unwrap()
        );
        assert_eq!(overview.order_count, 6);
        assert_eq!(overview.total_spend, Decimal::new(12_000, 2));
        assert_eq!(overview.review_count, 1);
    }

    #[tokio::test]
    async fn test_deleted_account_is_not_found() {
        let (profile, _, mut user) = setup().await;
        user.id = UserId::new(999);
        let err = profile.overview(&user).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound("user")));
    }
}
