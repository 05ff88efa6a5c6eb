//! Local order queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use emporium_core::{OrderId, OrderStatus, ProductId, UserId};

use super::{OrderStore, PgStore, RepositoryError};
use crate::models::{NewOrder, Order, OrderDetail, OrderLine, OrderTotals};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    total: Decimal,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            total: row.total,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

#[derive(sqlx::FromRow)]
struct OrderTotalsRow {
    order_count: i64,
    total_spend: Decimal,
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO storefront.order (user_id, status, total)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, status, total, created_at
            ",
        )
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.total())
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO storefront.order_item (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(row.into())
    }
    async fn recent_orders(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, status, total, created_at
            FROM storefront.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let lines = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price
            FROM storefront.order_item oi
            JOIN storefront.product p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders
            .into_iter()
            .map(|row| {
                let order_id = row.id;
                OrderDetail {
                    order: row.into(),
                    lines: lines
                        .iter()
                        .filter(|l| l.order_id == order_id)
                        .map(|l| OrderLine {
                            product_id: l.product_id,
                            product_name: l.product_name.clone(),
                            quantity: l.quantity,
                            price: l.price,
                        })
                        .collect(),
                }
            })
            .collect())
    }

    async fn order_totals(&self, user_id: UserId) -> Result<OrderTotals, RepositoryError> {
        let row = sqlx::query_as::<_, OrderTotalsRow>(
            r"
            SELECT COUNT(*) AS order_count,
                   COALESCE(SUM(total) FILTER (WHERE status <> 'cancelled'), 0) AS total_spend
            FROM storefront.order
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(OrderTotals {
            order_count: row.order_count,
            total_spend: row.total_spend,
        })
    }
}
