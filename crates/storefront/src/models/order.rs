//! Local order records.
//!
//! These rows come from seed data. Live order history is read from the
//! payment provider (see [`crate::services::orders`]).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use emporium_core::{OrderId, OrderStatus, ProductId, UserId};

/// A locally recorded order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
}

/// One line of a [`NewOrder`]; `price` is the unit price paid.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
}

impl NewOrder {
    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }
}

/// One line of a recorded order, with the product name at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// Unit price paid.
    pub price: Decimal,
}

impl OrderLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Aggregates over every order of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderTotals {
    pub order_count: i64,
    /// Sum of totals over orders that were not cancelled.
    pub total_spend: Decimal,
}
