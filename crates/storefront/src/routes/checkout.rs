//! Checkout route handlers.
//!
//! Payment happens on the provider's hosted page. `POST /checkout` creates
//! the session and returns its URL; the browser navigates there. The
//! provider sends the buyer back to `/checkout/success` or
//! `/checkout/canceled`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query, State},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::CART_UPDATED_TRIGGER;
use super::cart::{CartView, unauthenticated};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::CurrentUser;
use crate::services::{ActionResult, CartContext, ShopError};
use crate::state::AppState;

/// Successful response of `POST /checkout`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub checkout_url: String,
    pub session_id: String,
}

/// Query parameters of the success redirect.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub checkout_id: Option<String>,
}

/// Checkout review page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutShowTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
}

/// Checkout success page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub user: Option<CurrentUser>,
    pub checkout_id: Option<String>,
}

/// Checkout canceled page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/canceled.html")]
pub struct CheckoutCanceledTemplate {
    pub user: Option<CurrentUser>,
}

/// Display the checkout review page.
#[instrument(skip(state, user))]
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    let contents = state.cart().contents(&CartContext::for_user(&user)).await;
    CheckoutShowTemplate {
        cart: CartView::from(&contents),
        user: Some(user),
    }
}

/// Create a hosted checkout session for the cart.
#[instrument(skip(state, user))]
pub async fn create(State(state): State<AppState>, OptionalAuth(user): OptionalAuth) -> Response {
    let Some(user) = user else {
        return unauthenticated();
    };

    match state.checkout().create_checkout_session(&user).await {
        Ok(redirect) => {
            add_breadcrumb(
                "checkout",
                "Checkout session created",
                &[("session_id", redirect.session_id.clone())],
            );
            Json(CheckoutResponse {
                success: true,
                checkout_url: redirect.checkout_url,
                session_id: redirect.session_id,
            })
            .into_response()
        }
        Err(ShopError::Provider(e)) => {
            tracing::error!(error = %e, "Checkout provider call failed");
            Json(ActionResult::failure("Failed to create checkout session")).into_response()
        }
        Err(err) => Json(ActionResult::from(&err)).into_response(),
    }
}

/// Landing page after a successful payment. Clears the cart.
#[instrument(skip(state, user))]
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<SuccessQuery>,
) -> Result<Response> {
    state.checkout().complete(&user).await?;
    tracing::info!(checkout_id = ?query.checkout_id, "Checkout completed");

    Ok((
        AppendHeaders([("HX-Trigger", CART_UPDATED_TRIGGER)]),
        CheckoutSuccessTemplate {
            user: Some(user),
            checkout_id: query.checkout_id,
        },
    )
        .into_response())
}

/// Landing page when the buyer backs out of the hosted checkout.
pub async fn canceled(OptionalAuth(user): OptionalAuth) -> CheckoutCanceledTemplate {
    CheckoutCanceledTemplate { user }
}
