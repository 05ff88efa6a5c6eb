//! User domain types.

use chrono::{DateTime, Utc};

use emporium_core::{Email, Role, UserId};

/// A storefront user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name (may be empty).
    pub name: String,
    /// Access role.
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub role: Role,
}

/// A user row in the admin list, with their local order count.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub user: User,
    pub order_count: i64,
}

/// Filters for the admin user list.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive substring matched against name and email.
    pub search: Option<String>,
    /// Only users with this role.
    pub role: Option<Role>,
    /// 1-based page number.
    pub page: u32,
}
