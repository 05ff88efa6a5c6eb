//! Authentication route handlers.
//!
//! Handles login, registration and logout with email and password.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters of the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub email: String,
    pub next: String,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub email: String,
    pub name: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Only same-site paths are accepted as post-login destinations.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/products",
    }
}

/// Start an authenticated session for `user`.
///
/// The session ID is cycled to prevent fixation.
async fn sign_in(session: &Session, user: &User) -> Result<(), AppError> {
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Status code for a failed form submission.
const fn form_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
        AuthError::Repository(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(safe_next(query.next.as_deref())).into_response();
    }
    LoginTemplate {
        user,
        error: None,
        email: String::new(),
        next: query.next.unwrap_or_default(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match state.auth().login(&form.email, &form.password).await {
        Ok(user) => {
            sign_in(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User logged in");
            Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
        }
        Err(err @ (AuthError::Repository(_) | AuthError::PasswordHash)) => Err(err.into()),
        Err(err) => {
            tracing::info!(error = %err, "Login failed");
            Ok((
                form_status(&err),
                LoginTemplate {
                    user: None,
                    error: Some(err.user_message()),
                    email: form.email,
                    next: form.next.unwrap_or_default(),
                },
            )
                .into_response())
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalAuth(user): OptionalAuth) -> Response {
    if user.is_some() {
        return Redirect::to("/products").into_response();
    }
    RegisterTemplate {
        user,
        error: None,
        email: String::new(),
        name: String::new(),
    }
    .into_response()
}

/// Handle registration form submission. The new account is signed in.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let rerender = |status: StatusCode, error: String, form: RegisterForm| {
        (
            status,
            RegisterTemplate {
                user: None,
                error: Some(error),
                email: form.email,
                name: form.name,
            },
        )
            .into_response()
    };

    if form.password != form.password_confirm {
        return Ok(rerender(
            StatusCode::BAD_REQUEST,
            "Passwords do not match".to_string(),
            form,
        ));
    }

    match state
        .auth()
        .register(&form.email, &form.name, &form.password)
        .await
    {
        Ok(user) => {
            sign_in(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User registered");
            Ok(Redirect::to("/products").into_response())
        }
        Err(err @ (AuthError::Repository(_) | AuthError::PasswordHash)) => Err(err.into()),
        Err(err) => Ok(rerender(form_status(&err), err.user_message(), form)),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// End the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to clear session user");
    }
    if let Err(e) = session.flush().await {
        tracing::warn!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();
    Redirect::to("/products").into_response()
}
