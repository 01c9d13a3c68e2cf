//! Authentication service.
//!
//! Password signup and login, plus password reset by emailed link. Reset
//! tokens are 32 random bytes, hex-encoded; only their SHA-256 digest is
//! stored, with a one hour expiry.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use bazaar_core::Email;

use crate::db::{RepositoryError, Store};
use crate::models::User;
use crate::services::email::{Mailer, send_password_reset};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
const MAX_PASSWORD_LENGTH: usize = 16;

/// How long a reset link stays valid.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    mailer: &'a dyn Mailer,
    base_url: &'a str,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    ///
    /// `base_url` prefixes the links in reset emails.
    #[must_use]
    pub const fn new(store: &'a dyn Store, mailer: &'a dyn Mailer, base_url: &'a str) -> Self {
        Self {
            store,
            mailer,
            base_url,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` for
    /// malformed input, and `AuthError::InvalidCredentials` if the email is
    /// unknown or the password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let (user, password_hash) = self
            .store
            .password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Email a reset link if an account exists for `email`.
    ///
    /// Unknown addresses and mail failures return `Ok` as well, so callers
    /// cannot tell whether an account exists. Mail failures are logged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for malformed input and
    /// `AuthError::Repository` if the store fails.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        let Some(user) = self.store.user_by_email(&email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.store
            .store_reset_token(user.id, &digest_token(&token), expires_at)
            .await?;

        let reset_url = format!("{}/reset/{token}", self.base_url.trim_end_matches('/'));
        if let Err(e) = send_password_reset(self.mailer, &user.email, &reset_url).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        } else {
            tracing::info!(user_id = %user.id, "Password reset email sent");
        }

        Ok(())
    }

    /// The user a still-valid reset token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or expired.
    pub async fn user_for_reset_token(&self, token: &str) -> Result<User, AuthError> {
        self.store
            .user_by_reset_token(&digest_token(token), Utc::now())
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Set a new password using a reset token; the token is consumed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` for unknown or expired tokens and
    /// the same password errors as [`signup`](Self::signup).
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        validate_password(password)?;
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let user = self.user_for_reset_token(token).await?;
        let password_hash = hash_password(password)?;
        self.store.update_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }
}

/// Validate password format: 8 to 16 ASCII letters and digits.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password.len()) {
        return Err(AuthError::WeakPassword(format!(
            "password must be {MIN_PASSWORD_LENGTH} to {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    if !password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AuthError::WeakPassword(
            "password may only contain letters and numbers".to_owned(),
        ));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// 32 random bytes, hex-encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The stored form of a reset token.
fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Hash a password for accounts created outside the web flow (CLI).
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` or `AuthError::PasswordHash`.
pub fn hash_new_password(password: &str) -> Result<String, AuthError> {
    validate_password(password)?;
    hash_password(password)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::services::email::MemoryMailer;

    const BASE_URL: &str = "https://shop.example.com";

    fn token_from(body: &str) -> String {
        let start = body.find("/reset/").unwrap() + "/reset/".len();
        body[start..start + 64].to_owned()
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("abcd1234").is_ok());
        assert!(validate_password("abcdefghijklmnop").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("abcdefghijklmnopq").is_err());
        assert!(validate_password("has space1").is_err());
        assert!(validate_password("symbols!!").is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret123", &hash).is_ok());
        assert!(matches!(
            verify_password("secret124", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(digest_token(&token), token);
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let auth = AuthService::new(&store, &mailer, BASE_URL);

        let user = auth
            .signup(" New@Example.com ", "secret123", "secret123")
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "new@example.com");

        let logged_in = auth.login("new@example.com", "secret123").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("new@example.com", "wrongpass1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "secret123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicates_and_mismatch() {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let auth = AuthService::new(&store, &mailer, BASE_URL);

        auth.signup("a@example.com", "secret123", "secret123")
            .await
            .unwrap();
        assert!(matches!(
            auth.signup("a@example.com", "secret123", "secret123").await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            auth.signup("b@example.com", "secret123", "secret124").await,
            Err(AuthError::PasswordMismatch)
        ));
    }

    #[tokio::test]
    async fn test_reset_flow() {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let auth = AuthService::new(&store, &mailer, BASE_URL);
        let user = auth
            .signup("a@example.com", "secret123", "secret123")
            .await
            .unwrap();

        auth.request_password_reset("a@example.com").await.unwrap();
        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html_body.contains("https://shop.example.com/reset/"));
        let token = token_from(&sent[0].html_body);

        assert_eq!(auth.user_for_reset_token(&token).await.unwrap().id, user.id);
        auth.reset_password(&token, "newpass99", "newpass99")
            .await
            .unwrap();

        assert!(auth.login("a@example.com", "newpass99").await.is_ok());
        assert!(matches!(
            auth.login("a@example.com", "secret123").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.reset_password(&token, "another12", "another12").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_reset_for_unknown_email_is_silent() {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let auth = AuthService::new(&store, &mailer, BASE_URL);

        auth.request_password_reset("ghost@example.com")
            .await
            .unwrap();
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let auth = AuthService::new(&store, &mailer, BASE_URL);
        let user = auth
            .signup("a@example.com", "secret123", "secret123")
            .await
            .unwrap();

        store
            .store_reset_token(
                user.id,
                &digest_token("stale"),
                Utc::now() - Duration::minutes(5),
            )
            .await
            .unwrap();

        assert!(matches!(
            auth.user_for_reset_token("stale").await,
            Err(AuthError::InvalidResetToken)
        ));
    }
}
