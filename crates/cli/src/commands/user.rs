//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli user create -e owner@example.com -p Secret123
//! ```

use bazaar_core::Email;
use bazaar_storefront::db::{RepositoryError, UserStore};
use bazaar_storefront::services::auth::hash_new_password;

use super::{CliError, connect};

/// Create a user who can log in with `password`.
///
/// The password follows the signup rules (8 to 16 letters and digits).
///
/// # Errors
///
/// Returns `CliError::Invalid` for a malformed email, a rejected password or
/// an email that is already registered.
pub async fn create(email: &str, password: &str) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::Invalid(e.to_string()))?;
    let password_hash = hash_new_password(password).map_err(|e| CliError::Invalid(e.to_string()))?;

    let store = connect().await?;
    let user = store
        .create_user(&email, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                CliError::Invalid(format!("a user with email {email} already exists"))
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, "User created");
    Ok(())
}
