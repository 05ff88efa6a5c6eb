//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::Stores;
use crate::polar::PaymentProvider;
use crate::services::{
    AccountService, AuthService, CartService, CatalogService, CheckoutService, OrderService,
    ProfileService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Services are built on demand
/// from the stores and the payment provider it holds; the only state kept
/// between requests is the order service's customer cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stores: Stores,
    pool: Option<PgPool>,
    payments: Arc<dyn PaymentProvider>,
    orders: OrderService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `stores` - Store handles (`PostgreSQL` or in-memory)
    /// * `payments` - Payment provider client
    /// * `pool` - Connection pool checked by the readiness probe, if any
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        stores: Stores,
        payments: Arc<dyn PaymentProvider>,
        pool: Option<PgPool>,
    ) -> Self {
        let orders = OrderService::new(Arc::clone(&payments));
        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                pool,
                payments,
                orders,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the store handles.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Get the database connection pool, if the state is backed by one.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get a reference to the payment provider client.
    #[must_use]
    pub fn payments(&self) -> &Arc<dyn PaymentProvider> {
        &self.inner.payments
    }

    // =========================================================================
    // Services
    // =========================================================================

    #[must_use]
    pub fn cart(&self) -> CartService {
        CartService::new(&self.inner.stores)
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(
            Arc::clone(&self.inner.stores.carts),
            Arc::clone(&self.inner.payments),
            self.inner.config.base_url.clone(),
        )
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(
            Arc::clone(&self.inner.stores.catalog),
            Arc::clone(&self.inner.payments),
            self.inner.config.polar.sync_products,
        )
    }

    #[must_use]
    pub fn accounts(&self) -> AccountService {
        AccountService::new(Arc::clone(&self.inner.stores.users))
    }

    #[must_use]
    pub fn profile(&self) -> ProfileService {
        ProfileService::new(&self.inner.stores)
    }

    #[must_use]
    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.inner.stores.users))
    }
}
