//! Account overview route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use super::format_price;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, OrderDetail};
use crate::services::AccountOverview;
use crate::state::AppState;

/// A local order as shown on the account page.
#[derive(Clone)]
pub struct RecentOrderView {
    pub id: String,
    pub date: String,
    pub status: String,
    pub total: String,
    pub items: Vec<RecentOrderItemView>,
}

#[derive(Clone)]
pub struct RecentOrderItemView {
    pub name: String,
    pub quantity: i32,
    pub amount: String,
}

impl From<&OrderDetail> for RecentOrderView {
    fn from(detail: &OrderDetail) -> Self {
        Self {
            id: detail.order.id.to_string(),
            date: detail.order.created_at.format("%B %-d, %Y").to_string(),
            status: detail.order.status.to_string(),
            total: format_price(detail.order.total),
            items: detail
                .lines
                .iter()
                .map(|line| RecentOrderItemView {
                    name: line.product_name.clone(),
                    quantity: line.quantity,
                    amount: format_price(line.line_total()),
                })
                .collect(),
        }
    }
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/show.html")]
pub struct AccountTemplate {
    pub user: Option<CurrentUser>,
    pub name: String,
    pub email: String,
    pub role: String,
    pub member_since: String,
    pub order_count: i64,
    pub total_spend: String,
    pub review_count: i64,
    pub recent_orders: Vec<RecentOrderView>,
}

impl AccountTemplate {
    fn new(current: CurrentUser, overview: &AccountOverview) -> Self {
        Self {
            name: current.display_name().to_owned(),
            email: overview.user.email.to_string(),
            role: overview.user.role.to_string(),
            member_since: overview.user.created_at.format("%B %-d, %Y").to_string(),
            order_count: overview.order_count,
            total_spend: format_price(overview.total_spend),
            review_count: overview.review_count,
            recent_orders: overview
                .recent_orders
                .iter()
                .map(RecentOrderView::from)
                .collect(),
            user: Some(current),
        }
    }
}

/// Display the account overview.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<AccountTemplate> {
    let overview = state.profile().overview(&user).await?;
    Ok(AccountTemplate::new(user, &overview))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use emporium_core::{OrderId, OrderStatus, ProductId, UserId};

    use super::*;
    use crate::models::{Order, OrderLine};

    #[test]
    fn test_order_lines_show_line_totals() {
        let detail = OrderDetail {
            order: Order {
                id: OrderId::new(12),
                user_id: UserId::new(1),
                status: OrderStatus::Shipped,
                total: Decimal::new(4_500, 2),
                created_at: Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap(),
            },
            lines: vec![OrderLine {
                product_id: ProductId::new(3),
                product_name: "Lamp Shade".to_string(),
                quantity: 3,
                price: Decimal::new(1_500, 2),
            }],
        };

        let view = RecentOrderView::from(&detail);
        assert_eq!(view.id, "12");
        assert_eq!(view.date, "March 9, 2025");
        assert_eq!(view.status, "shipped");
        assert_eq!(view.total, "$45.00");
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.items[0].amount, "$45.00");
    }
}
