//! User domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, UserId};

/// A registered shopper.
///
/// The password hash and reset token live in their own table and never
/// travel with this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalised email address (unique).
    pub email: Email,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
    /// When the user row last changed.
    pub updated_at: DateTime<Utc>,
}
