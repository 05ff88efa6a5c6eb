//! Cart route handlers.
//!
//! Mutations are JSON actions: they always answer with an [`ActionResult`]
//! (HTTP 200 for domain failures, 401 when signed out) and emit the
//! `cart-updated` trigger on success so the header badge refreshes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::ProductId;

use super::{CART_UPDATED_TRIGGER, format_price};
use crate::error::add_breadcrumb;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CartLine, CurrentUser};
use crate::services::{ActionResult, CartContents, CartContext, ShopError};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// A cart line as sent to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub inventory: i32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            name: line.product.name.clone(),
            sku: line.product.sku.clone(),
            image: line.product.primary_image().map(str::to_owned),
            quantity: line.item.quantity,
            inventory: line.product.inventory,
            unit_price: format_price(line.product.price),
            line_total: format_price(line.line_total()),
        }
    }
}

/// Cart contents as sent to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub items: Vec<CartLineView>,
    pub total_items: i64,
    pub total_price: String,
}

impl From<&CartContents> for CartView {
    fn from(contents: &CartContents) -> Self {
        Self {
            success: contents.success,
            message: contents.message.clone(),
            items: contents.lines.iter().map(CartLineView::from).collect(),
            total_items: contents.total_items,
            total_price: format_price(contents.total_price),
        }
    }
}

/// Header badge count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCount {
    pub count: i64,
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Body of `POST /cart/add` and `POST /cart/update`.
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Body of `POST /cart/remove`.
#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub product_id: ProductId,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
}

// =============================================================================
// Helpers
// =============================================================================

/// Turn the outcome of a cart mutation into the JSON action response.
pub(super) fn action_response<T>(result: Result<T, ShopError>) -> Response {
    match result {
        Ok(_) => (
            AppendHeaders([("HX-Trigger", CART_UPDATED_TRIGGER)]),
            Json(ActionResult::ok()),
        )
            .into_response(),
        Err(ShopError::Unauthenticated) => unauthenticated(),
        Err(err) => Json(ActionResult::from(&err)).into_response(),
    }
}

/// 401 with an action result explaining why.
pub(super) fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ActionResult::from(&ShopError::Unauthenticated)),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    let contents = state.cart().contents(&CartContext::for_user(&user)).await;
    CartShowTemplate {
        cart: CartView::from(&contents),
        user: Some(user),
    }
}

/// Cart contents as JSON.
#[instrument(skip(state, user))]
pub async fn contents(State(state): State<AppState>, OptionalAuth(user): OptionalAuth) -> Response {
    let Ok(ctx) = CartContext::require(user.as_ref()) else {
        return unauthenticated();
    };
    let contents = state.cart().contents(&ctx).await;
    Json(CartView::from(&contents)).into_response()
}

/// Number of units in the cart. Zero when signed out or on failure.
#[instrument(skip(state, user))]
pub async fn count(State(state): State<AppState>, OptionalAuth(user): OptionalAuth) -> Json<CartCount> {
    let count = match CartContext::require(user.as_ref()) {
        Ok(ctx) => state.cart().count(&ctx).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to count cart items");
            0
        }),
        Err(_) => 0,
    };
    Json(CartCount { count })
}

/// Add a product to the cart.
#[instrument(skip(state, user))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<QuantityRequest>,
) -> Response {
    let result = async {
        let ctx = CartContext::require(user.as_ref())?;
        state.cart().add_item(&ctx, body.product_id, body.quantity).await
    }
    .await;
    if result.is_ok() {
        add_breadcrumb(
            "cart",
            "Added to cart",
            &[
                ("product_id", body.product_id.to_string()),
                ("quantity", body.quantity.to_string()),
            ],
        );
    }
    action_response(result)
}

/// Set the quantity of a cart line. Zero or less removes it.
#[instrument(skip(state, user))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<QuantityRequest>,
) -> Response {
    let result = async {
        let ctx = CartContext::require(user.as_ref())?;
        state
            .cart()
            .update_quantity(&ctx, body.product_id, body.quantity)
            .await
    }
    .await;
    action_response(result)
}

/// Remove a product from the cart.
#[instrument(skip(state, user))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<RemoveRequest>,
) -> Response {
    let result = async {
        let ctx = CartContext::require(user.as_ref())?;
        state.cart().remove_item(&ctx, body.product_id).await
    }
    .await;
    action_response(result)
}

/// Remove everything from the cart.
#[instrument(skip(state, user))]
pub async fn clear(State(state): State<AppState>, OptionalAuth(user): OptionalAuth) -> Response {
    let result = async {
        let ctx = CartContext::require(user.as_ref())?;
        state.cart().clear(&ctx).await
    }
    .await;
    action_response(result)
}
