//! Authentication route handlers.
//!
//! Handles login, signup, logout and password reset. Form errors re-render
//! the form with the message and the email the user typed; store failures
//! become the generic error page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::PageMeta;
use crate::services::AuthError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Reset request form data.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub email: String,
}

/// New password form data.
#[derive(Debug, Deserialize)]
pub struct NewPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Query parameters for notices after a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub meta: PageMeta,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub email: String,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub meta: PageMeta,
    pub error: Option<String>,
    pub email: String,
}

/// Reset request page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub meta: PageMeta,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// New password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/new_password.html")]
pub struct NewPasswordTemplate {
    pub meta: PageMeta,
    pub error: Option<String>,
    pub token: String,
}

/// Known notice codes shown on the login and reset pages.
fn notice_text(code: Option<&str>) -> Option<String> {
    let text = match code? {
        "signed-up" => "Your account was created. Please log in.",
        "password-reset" => "Your password was changed. Please log in.",
        "reset-sent" => "If an account exists for that email, a reset link is on its way.",
        _ => return None,
    };
    Some(text.to_owned())
}

/// Message for auth errors the user can fix; anything else is a server error.
fn form_error(err: AuthError) -> Result<String> {
    let message = match err {
        AuthError::InvalidEmail(_) => "Please enter a valid email.".to_owned(),
        AuthError::InvalidCredentials => "Invalid email or password.".to_owned(),
        AuthError::UserAlreadyExists => {
            "E-Mail already exists, please pick a different one.".to_owned()
        }
        AuthError::WeakPassword(_) => {
            "Please enter a password with only numbers and letters, 8 to 16 characters long."
                .to_owned()
        }
        AuthError::PasswordMismatch => "Passwords have to match!".to_owned(),
        AuthError::InvalidResetToken => {
            "This reset link is invalid or has expired. Please request a new one.".to_owned()
        }
        AuthError::Repository(_) | AuthError::PasswordHash => return Err(err.into()),
    };
    Ok(message)
}

fn rejected(page: impl IntoResponse) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NoticeQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        meta: PageMeta::new("Login", "/login"),
        error: None,
        notice: notice_text(query.notice.as_deref()),
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let user = match state.auth().login(&form.email, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidEmail(e)) => {
            tracing::debug!(error = %e, "Login with malformed email");
            return Ok(rejected(LoginTemplate {
                meta: PageMeta::new("Login", "/login"),
                error: Some("Please enter a valid email.".to_owned()),
                notice: None,
                email: form.email,
            }));
        }
        // Password format errors read the same as a wrong password.
        Err(AuthError::WeakPassword(_) | AuthError::InvalidCredentials) => {
            tracing::info!("Login failed");
            return Ok(rejected(LoginTemplate {
                meta: PageMeta::new("Login", "/login"),
                error: Some("Invalid email or password.".to_owned()),
                notice: None,
                email: form.email,
            }));
        }
        Err(e) => return Err(e.into()),
    };

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));

    tracing::info!(user_id = %current.id, "User logged in");
    Ok(Redirect::to("/").into_response())
}

/// Handle logout.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

// =============================================================================
// Signup
// =============================================================================

/// Display the signup page.
pub async fn signup_page(OptionalAuth(user): OptionalAuth) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    SignupTemplate {
        meta: PageMeta::new("Signup", "/signup"),
        error: None,
        email: String::new(),
    }
    .into_response()
}

/// Handle signup form submission.
#[instrument(skip(state, form))]
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    match state
        .auth()
        .signup(&form.email, &form.password, &form.confirm_password)
        .await
    {
        Ok(_) => Ok(Redirect::to("/login?notice=signed-up").into_response()),
        Err(e) => {
            let message = form_error(e)?;
            Ok(rejected(SignupTemplate {
                meta: PageMeta::new("Signup", "/signup"),
                error: Some(message),
                email: form.email,
            }))
        }
    }
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the reset request page.
pub async fn reset_page(Query(query): Query<NoticeQuery>) -> ResetTemplate {
    ResetTemplate {
        meta: PageMeta::new("Reset Password", "/reset"),
        error: None,
        notice: notice_text(query.notice.as_deref()),
    }
}

/// Handle a reset request. The reply is the same whether or not the email
/// belongs to an account.
#[instrument(skip(state, form))]
pub async fn reset(
    State(state): State<AppState>,
    Form(form): Form<ResetForm>,
) -> Result<Response> {
    match state.auth().request_password_reset(&form.email).await {
        Ok(()) => Ok(Redirect::to("/reset?notice=reset-sent").into_response()),
        Err(e) => {
            let message = form_error(e)?;
            Ok(rejected(ResetTemplate {
                meta: PageMeta::new("Reset Password", "/reset"),
                error: Some(message),
                notice: None,
            }))
        }
    }
}

/// Display the new password form for a reset link.
#[instrument(skip(state, token))]
pub async fn new_password_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response> {
    match state.auth().user_for_reset_token(&token).await {
        Ok(_) => Ok(NewPasswordTemplate {
            meta: PageMeta::new("New Password", "/new-password"),
            error: None,
            token,
        }
        .into_response()),
        Err(AuthError::InvalidResetToken) => Ok(rejected(ResetTemplate {
            meta: PageMeta::new("Reset Password", "/reset"),
            error: Some(form_error(AuthError::InvalidResetToken)?),
            notice: None,
        })),
        Err(e) => Err(AppError::from(e)),
    }
}

/// Handle the new password form.
#[instrument(skip(state, form))]
pub async fn new_password(
    State(state): State<AppState>,
    Form(form): Form<NewPasswordForm>,
) -> Result<Response> {
    match state
        .auth()
        .reset_password(&form.token, &form.password, &form.confirm_password)
        .await
    {
        Ok(_) => Ok(Redirect::to("/login?notice=password-reset").into_response()),
        Err(e) => {
            let message = form_error(e)?;
            Ok(rejected(NewPasswordTemplate {
                meta: PageMeta::new("New Password", "/new-password"),
                error: Some(message),
                token: form.token,
            }))
        }
    }
}
