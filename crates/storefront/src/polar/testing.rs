//! In-process payment provider for tests.
//!
//! Compiled for this crate's unit tests and, through the `test-support`
//! feature, for the integration test harness.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{
    CheckoutSession, CreateCheckout, CreateProduct, Customer, PaymentError, PaymentProvider,
    PolarProduct, ProviderOrder,
};
use crate::models::User;

/// Stand-in for the Polar API that records every request and answers from
/// canned data.
#[derive(Default)]
pub struct FakePolar {
    unavailable: AtomicBool,
    checkouts: Mutex<Vec<CreateCheckout>>,
    products: Mutex<Vec<CreateProduct>>,
    /// external id -> (customer id, orders)
    customers: Mutex<HashMap<String, (String, Vec<ProviderOrder>)>>,
    customer_lookups: AtomicUsize,
}

impl FakePolar {
    /// A provider that rejects every call.
    #[must_use]
    pub fn failing() -> Self {
        let polar = Self::default();
        polar.go_down();
        polar
    }

    /// Make every following call fail with a 503.
    pub fn go_down(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    /// Register a customer with the given external ID and orders.
    pub fn add_customer(&self, external_id: &str, customer_id: &str, orders: Vec<ProviderOrder>) {
        self.customers
            .lock()
            .unwrap()
            .insert(external_id.to_owned(), (customer_id.to_owned(), orders));
    }

    /// Register a customer linked to a storefront user.
    pub fn link_user(&self, user: &User, orders: Vec<ProviderOrder>) {
        self.add_customer(&user.id.to_string(), &format!("cus_{}", user.id), orders);
    }

    /// Checkout requests received so far.
    #[must_use]
    pub fn checkouts(&self) -> Vec<CreateCheckout> {
        self.checkouts.lock().unwrap().clone()
    }

    /// Product creation requests received so far.
    #[must_use]
    pub fn products(&self) -> Vec<CreateProduct> {
        self.products.lock().unwrap().clone()
    }

    /// Number of customer lookups, failed ones included.
    #[must_use]
    pub fn customer_lookups(&self) -> usize {
        self.customer_lookups.load(Ordering::SeqCst)
    }

    fn ensure_up(&self) -> Result<(), PaymentError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PaymentError::Api {
                status: 503,
                message: "maintenance".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for FakePolar {
    async fn create_product(&self, product: &CreateProduct) -> Result<PolarProduct, PaymentError> {
        self.ensure_up()?;
        let mut products = self.products.lock().unwrap();
        products.push(product.clone());
        Ok(PolarProduct {
            id: format!("prod_fake_{}", products.len()),
            name: product.name.clone(),
        })
    }

    async fn create_checkout(
        &self,
        checkout: &CreateCheckout,
    ) -> Result<CheckoutSession, PaymentError> {
        self.ensure_up()?;
        let mut checkouts = self.checkouts.lock().unwrap();
        checkouts.push(checkout.clone());
        let id = format!("checkout_{}", checkouts.len());
        Ok(CheckoutSession {
            url: format!("https://polar.test/checkout/{id}"),
            id,
            status: Some("open".to_owned()),
        })
    }

    async fn customer_by_external_id(&self, external_id: &str) -> Result<Customer, PaymentError> {
        self.customer_lookups.fetch_add(1, Ordering::SeqCst);
        self.ensure_up()?;
        self.customers
            .lock()
            .unwrap()
            .get(external_id)
            .map(|(id, _)| Customer {
                id: id.clone(),
                email: None,
                name: None,
                external_id: Some(external_id.to_owned()),
            })
            .ok_or(PaymentError::NotFound)
    }

    async fn list_orders(&self, customer_id: &str) -> Result<Vec<ProviderOrder>, PaymentError> {
        self.ensure_up()?;
        Ok(self
            .customers
            .lock()
            .unwrap()
            .values()
            .find(|(id, _)| id == customer_id)
            .map(|(_, orders)| orders.clone())
            .unwrap_or_default())
    }
}
