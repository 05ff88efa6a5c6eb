//! Admin panel route handlers.
//!
//! User management requires the `admin` role; product management is open
//! to `admin` and `employee`. Other users get 404.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::{ProductId, Role, UserId};

use super::format_price;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireStaff};
use crate::models::{Category, CurrentUser, Product, UserFilter, UserSummary};
use crate::services::{ActionResult, ProductInput, SyncReport};
use crate::state::AppState;

// =============================================================================
// Users
// =============================================================================

/// Query parameters of the user listing.
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub page: Option<u32>,
}

/// User row data for templates.
#[derive(Clone)]
pub struct UserRowView {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub order_count: i64,
    pub joined: String,
    pub is_self: bool,
}

impl UserRowView {
    fn new(summary: &UserSummary, actor: &CurrentUser) -> Self {
        Self {
            id: summary.user.id,
            email: summary.user.email.to_string(),
            name: summary.user.name.clone(),
            role: summary.user.role,
            order_count: summary.order_count,
            joined: summary.user.created_at.format("%Y-%m-%d").to_string(),
            is_self: summary.user.id == actor.id,
        }
    }
}

/// Admin user listing template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct AdminUsersTemplate {
    pub user: Option<CurrentUser>,
    pub users: Vec<UserRowView>,
    pub roles: Vec<Role>,
    pub search: String,
    pub role: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
    pub total: u64,
}

impl AdminUsersTemplate {
    /// Link to another page of the same listing.
    #[must_use]
    pub fn page_link(&self, page: u32) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if !self.search.is_empty() {
            query.append_pair("search", &self.search);
        }
        if !self.role.is_empty() {
            query.append_pair("role", &self.role);
        }
        query.append_pair("page", &page.to_string());
        format!("/admin/users?{}", query.finish())
    }
}

/// Role change form data.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// List users.
#[instrument(skip(state, admin))]
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<UsersQuery>,
) -> Result<AdminUsersTemplate> {
    let search = query.search.unwrap_or_default().trim().to_owned();
    let role_text = query.role.unwrap_or_default().trim().to_owned();
    let role = if role_text.is_empty() {
        None
    } else {
        Some(role_text.parse::<Role>().map_err(AppError::BadRequest)?)
    };

    let filter = UserFilter {
        search: Some(search.clone()).filter(|s| !s.is_empty()),
        role,
        page: query.page.unwrap_or(1).max(1),
    };
    let page = state.accounts().list_users(&filter).await?;

    Ok(AdminUsersTemplate {
        users: page.items.iter().map(|s| UserRowView::new(s, &admin)).collect(),
        roles: Role::ALL.to_vec(),
        search,
        role: role.map(|r| r.as_str().to_owned()).unwrap_or_default(),
        current_page: page.page,
        total_pages: page.total_pages(),
        has_prev: page.has_prev(),
        has_next: page.has_next(),
        total: page.total,
        user: Some(admin),
    })
}

/// Change a user's role.
#[instrument(skip(state, admin, form))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect> {
    let role: Role = form.role.parse().map_err(AppError::BadRequest)?;
    state.accounts().change_role(&admin, id, role).await?;
    Ok(Redirect::to("/admin/users"))
}

// =============================================================================
// Products
// =============================================================================

/// Product row data for templates.
#[derive(Clone)]
pub struct ProductRowView {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub price: String,
    pub inventory: i32,
    pub is_active: bool,
    pub synced: bool,
}

impl From<&Product> for ProductRowView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            price: format_price(product.price),
            inventory: product.inventory,
            is_active: product.is_active,
            synced: product.polar_product_id.is_some(),
        }
    }
}

/// Admin product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<ProductRowView>,
    pub can_sync: bool,
}

/// New product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/new_product.html")]
pub struct NewProductTemplate {
    pub user: Option<CurrentUser>,
    pub categories: Vec<Category>,
}

/// Inventory form data.
#[derive(Debug, Deserialize)]
pub struct InventoryForm {
    pub inventory: i32,
}

/// Response of `POST /admin/products`.
#[derive(Debug, Serialize)]
pub struct CreatedProduct {
    pub success: bool,
    pub product_id: ProductId,
    pub sku: String,
    pub synced: bool,
}

/// List every product.
#[instrument(skip(state, staff))]
pub async fn products(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> Result<AdminProductsTemplate> {
    let products = state.catalog().list_all_products().await?;
    Ok(AdminProductsTemplate {
        products: products.iter().map(ProductRowView::from).collect(),
        can_sync: staff.role.can_manage_users(),
        user: Some(staff),
    })
}

/// Display the new product form.
#[instrument(skip(state, staff))]
pub async fn new_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> Result<NewProductTemplate> {
    Ok(NewProductTemplate {
        categories: state.catalog().list_categories().await?,
        user: Some(staff),
    })
}

/// Create a product from a JSON body.
#[instrument(skip(state, staff, input), fields(staff_id = %staff.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(input): Json<ProductInput>,
) -> Response {
    match state.catalog().create_product(input).await {
        Ok(product) => Json(CreatedProduct {
            success: true,
            product_id: product.id,
            synced: product.polar_product_id.is_some(),
            sku: product.sku,
        })
        .into_response(),
        Err(err) => Json(ActionResult::from(&err)).into_response(),
    }
}

/// Overwrite a product's stock level.
#[instrument(skip(state, _staff))]
pub async fn set_inventory(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<ProductId>,
    Form(form): Form<InventoryForm>,
) -> Result<Redirect> {
    state.catalog().set_inventory(id, form.inventory).await?;
    Ok(Redirect::to("/admin/products"))
}

/// Push every unmapped product to the payment provider.
#[instrument(skip(state, _admin))]
pub async fn sync_products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<SyncReport>> {
    Ok(Json(state.catalog().sync_unmapped().await?))
}
