//! Authentication middleware and extractors.
//!
//! The session only carries a [`CurrentUser`] snapshot. Every extractor
//! reloads the user from the store, so a role change takes effect on the
//! next request and a deleted account is logged out.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user.
///
/// If the user is not logged in, page requests are redirected to the login
/// page and `/api/` requests get 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires the `admin` role.
///
/// Other roles get 404 so the admin panel is not revealed.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that requires a role that may manage products
/// (`admin` or `employee`).
pub struct RequireStaff(pub CurrentUser);

/// Error returned when authentication or a role is required.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Signed in, but the role does not allow this page.
    NotFound,
    /// The user could not be loaded.
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl AuthRejection {
    fn unauthenticated(parts: &Parts) -> Self {
        if parts.uri.path().starts_with("/api/") {
            Self::Unauthorized
        } else {
            Self::RedirectToLogin
        }
    }
}

/// Load the signed-in user, refreshed from the store.
///
/// Keeps the session snapshot in sync and drops it when the account no
/// longer exists.
async fn load_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AuthRejection> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };

    let Some(cached) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    match state.stores().users.get_by_id(cached.id).await {
        Ok(Some(user)) => {
            let fresh = CurrentUser::from(&user);
            if fresh != cached
                && let Err(e) = set_current_user(session, &fresh).await
            {
                tracing::warn!(error = %e, "Failed to refresh session user");
            }
            Ok(Some(fresh))
        }
        Ok(None) => {
            tracing::info!(user_id = %cached.id, "Session user no longer exists");
            if let Err(e) = clear_current_user(session).await {
                tracing::warn!(error = %e, "Failed to clear session user");
            }
            Ok(None)
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %cached.id, "Failed to load session user");
            Err(AuthRejection::Internal)
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_user(parts, state)
            .await?
            .map(Self)
            .ok_or_else(|| AuthRejection::unauthenticated(parts))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.role.can_manage_users() {
            return Err(AuthRejection::NotFound);
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.role.can_manage_products() {
            return Err(AuthRejection::NotFound);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is
/// not logged in. A store failure is logged and treated as signed out.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     OptionalAuth(user): OptionalAuth,
/// ) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.display_name()),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(load_user(parts, state).await.unwrap_or(None)))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
