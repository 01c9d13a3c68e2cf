//! Authentication extractors.
//!
//! The session stores a [`CurrentUser`]. The extractors resolve it once per
//! request and re-check it against the store, so a deleted account loses its
//! session on the next request. Handlers receive the user by value.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{error_page, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// No session layer, or the session/user lookup failed.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unavailable => error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again later.",
            ),
        }
    }
}

/// Resolve the session user, dropping sessions whose account is gone.
async fn resolve_user(
    session: &Session,
    state: &AppState,
) -> Result<Option<CurrentUser>, AuthRejection> {
    let stored: Option<CurrentUser> = session
        .get(session_keys::CURRENT_USER)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read session");
            AuthRejection::Unavailable
        })?;

    let Some(stored) = stored else {
        return Ok(None);
    };

    let user = state.store().user_by_id(stored.id).await.map_err(|e| {
        tracing::error!(error = %e, user_id = %stored.id, "Failed to load session user");
        AuthRejection::Unavailable
    })?;

    match user {
        Some(user) => {
            let current = CurrentUser::from(&user);
            set_sentry_user(&current.id, Some(current.email.as_str()));
            Ok(Some(current))
        }
        None => {
            tracing::info!(user_id = %stored.id, "Session user no longer exists");
            if let Err(e) = session.flush().await {
                tracing::warn!(error = %e, "Failed to flush stale session");
            }
            Ok(None)
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unavailable)?;

        resolve_user(&session, state)
            .await?
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not
/// logged in. Lookup failures are logged and treated as logged out.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>().cloned() {
            Some(session) => resolve_user(&session, state).await.unwrap_or_default(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to log a user in: rotate the session ID and store the user.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to log a user out by discarding the whole session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
