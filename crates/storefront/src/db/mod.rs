//! Data store for the storefront.
//!
//! Services never talk to a concrete backend. They hold an
//! `Arc<dyn Store>` and call the narrow traits below:
//!
//! - [`UserStore`] - accounts, password hashes, reset tokens
//! - [`ProductStore`] - catalog CRUD and pagination
//! - [`CartStore`] - per-user carts with atomic increments
//! - [`OrderStore`] - order snapshots, placed together with clearing the cart
//!
//! Two implementations exist: [`PgStore`] (production, schema `storefront`)
//! and [`MemoryStore`] (tests and local demos).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{Email, OrderId, Page, PageRequest, ProductId, UserId};

use crate::models::{Cart, NewOrder, Order, Product, ProductDraft, User};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email) or a lost compare-and-swap.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Accounts and credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Create a user together with their password hash.
    ///
    /// Fails with [`RepositoryError::Conflict`] if the email is taken.
    async fn create_user(&self, email: &Email, password_hash: &str)
    -> Result<User, RepositoryError>;

    /// The user and their password hash, if both exist.
    async fn password_hash(&self, email: &Email)
    -> Result<Option<(User, String)>, RepositoryError>;

    /// Replace any pending reset token of `user_id` with `token_digest`.
    async fn store_reset_token(
        &self,
        user_id: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// The user owning an unexpired reset token with this digest.
    async fn user_by_reset_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;

    /// Set a new password hash and drop any pending reset token.
    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError>;
}

/// The product catalog.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// One page of all products, ordered by ID.
    async fn products_page(&self, request: PageRequest) -> Result<Page<Product>, RepositoryError>;

    /// Products created by `owner`, ordered by ID.
    async fn products_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError>;

    async fn create_product(
        &self,
        owner: UserId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError>;

    /// Replace the fields of a product owned by `owner`.
    ///
    /// Returns `None` when the product is absent or owned by someone else.
    async fn update_product(
        &self,
        id: ProductId,
        owner: UserId,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product owned by `owner`, removing it from every cart.
    ///
    /// Returns the deleted product, or `None` when it is absent or owned by
    /// someone else.
    async fn delete_product(
        &self,
        id: ProductId,
        owner: UserId,
    ) -> Result<Option<Product>, RepositoryError>;
}

/// Per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart; empty if they never added anything.
    async fn cart(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// Atomically add one unit of `product_id`.
    ///
    /// Returns the updated cart, or `None` if the item already holds
    /// `max_quantity` (the cart is then unchanged). Fails with
    /// [`RepositoryError::NotFound`] if the product does not exist.
    async fn increment_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        max_quantity: u32,
    ) -> Result<Option<Cart>, RepositoryError>;

    /// Remove the item for `product_id`; absent items are a no-op.
    async fn remove_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, RepositoryError>;

    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError>;
}

/// Immutable orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert `order` and empty the buyer's cart in one transaction.
    ///
    /// The cart must still hold exactly the items of `expected`; otherwise
    /// nothing is written and [`RepositoryError::Conflict`] is returned.
    async fn place_order(&self, order: &NewOrder, expected: &Cart)
    -> Result<OrderId, RepositoryError>;

    /// All orders of `user_id`, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;
}

/// Everything the storefront needs from its backend.
#[async_trait]
pub trait Store: UserStore + ProductStore + CartStore + OrderStore {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL` implementation of [`Store`].
///
/// The trait impls live in the per-table modules.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, shared with the session store.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Convert a stored `INTEGER` quantity.
pub(crate) fn quantity_from_db(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid quantity: {quantity}")))
}

/// Convert a quantity for storage.
pub(crate) fn quantity_to_db(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity out of range: {quantity}")))
}
