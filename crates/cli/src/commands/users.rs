//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a staff account
//! emporium user create -e admin@example.com -n "Admin Name" -p 'long passphrase' -r admin
//!
//! # Promote or demote an existing account
//! emporium user set-role -e clerk@example.com -r employee
//! ```

use emporium_core::{Email, EmailError, Role, UserId};
use emporium_storefront::db::{RepositoryError, Stores};
use emporium_storefront::services::{AuthError, AuthService};

use super::{CommandError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, employee, customer")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No account with that email.
    #[error("No user with email: {0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn parse_role(role: &str) -> Result<Role, UserError> {
    role.parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))
}

/// Create a user with a password and role.
///
/// # Errors
///
/// Returns `UserError` for an invalid role, email or password, a taken
/// email, or a database failure.
pub async fn create(email: &str, name: &str, password: &str, role: &str) -> Result<UserId, UserError> {
    let role = parse_role(role)?;
    let stores = Stores::postgres(connect().await?);

    tracing::info!("Creating user: {} ({})", email, role);
    let user = AuthService::new(stores.users)
        .create_user(email, name, password, role)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}

/// Change the role of an existing user.
///
/// # Errors
///
/// Returns `UserError` for an invalid role or email, an unknown user, or a
/// database failure.
pub async fn set_role(email: &str, role: &str) -> Result<(), UserError> {
    let role = parse_role(role)?;
    let email = Email::parse(email)?;
    let stores = Stores::postgres(connect().await?);

    let user = stores
        .users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| UserError::NotFound(email.to_string()))?;

    if user.role == role {
        tracing::info!("{} already has role {}", user.email, role);
        return Ok(());
    }

    let updated = stores.users.set_role(user.id, role).await?;
    tracing::info!("{}: {} -> {}", updated.email, user.role, updated.role);
    Ok(())
}
