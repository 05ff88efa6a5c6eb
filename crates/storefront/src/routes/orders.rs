//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use tracing::instrument;

use emporium_core::{CurrencyCode, Money};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::polar::ProviderOrder;
use crate::state::AppState;

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub date: String,
    pub status: String,
    pub total: String,
    pub items: Vec<OrderItemView>,
}

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub label: String,
    pub amount: String,
}

impl From<&ProviderOrder> for OrderView {
    fn from(order: &ProviderOrder) -> Self {
        let currency = order.currency.parse().unwrap_or(CurrencyCode::USD);
        let mut items: Vec<OrderItemView> = order
            .items
            .iter()
            .map(|item| OrderItemView {
                label: item.label.clone(),
                amount: Money::from_minor_units(item.amount, currency).to_string(),
            })
            .collect();
        if items.is_empty()
            && let Some(product) = &order.product
        {
            items.push(OrderItemView {
                label: product.name.clone(),
                amount: Money::from_minor_units(order.total_amount, currency).to_string(),
            });
        }

        Self {
            id: order.id.clone(),
            date: order.created_at.format("%B %-d, %Y").to_string(),
            status: order.status.clone(),
            total: Money::from_minor_units(order.total_amount, currency).to_string(),
            items,
        }
    }
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub user: Option<CurrentUser>,
    pub orders: Vec<OrderView>,
}

/// Display the order history page.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<OrdersIndexTemplate> {
    let orders = state.orders().orders_for(&user).await?;
    Ok(OrdersIndexTemplate {
        orders: orders.iter().map(OrderView::from).collect(),
        user: Some(user),
    })
}

/// Orders as JSON, amounts in minor units.
#[instrument(skip(state, user))]
pub async fn api_index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ProviderOrder>>> {
    Ok(Json(state.orders().orders_for(&user).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::polar::types::OrderProduct;

    #[test]
    fn test_amounts_are_shown_in_major_units() {
        let order = ProviderOrder {
            id: "ord_1".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap(),
            status: "paid".to_string(),
            total_amount: 4_250,
            currency: "usd".to_string(),
            product: Some(OrderProduct {
                id: "prod_1".to_string(),
                name: "Desk Lamp".to_string(),
            }),
            items: Vec::new(),
        };

        let view = OrderView::from(&order);
        assert_eq!(view.total, "$42.50");
        assert_eq!(view.date, "March 9, 2025");
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].label, "Desk Lamp");
    }
}
