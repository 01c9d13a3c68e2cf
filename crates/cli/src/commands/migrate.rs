//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Schema migrations live in `crates/storefront/migrations/`. The session
//! table belongs to `tower-sessions-sqlx-store`, which creates it itself.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CliError, connect};

/// Run the storefront schema migrations, then create the session table.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let store = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations")
        .run(store.pool())
        .await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(store.pool().clone()).migrate().await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
