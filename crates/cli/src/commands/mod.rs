//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod user;

use thiserror::Error;

use bazaar_storefront::config::ConfigError;
use bazaar_storefront::db::{self, PgStore, RepositoryError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A store operation failed.
    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),

    /// A seed file could not be read.
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// A seed file is not valid YAML for its schema.
    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Input rejected before touching the database.
    #[error("{0}")]
    Invalid(String),
}

/// Connect to the storefront database named by the environment.
async fn connect() -> Result<PgStore, CliError> {
    let database_url = bazaar_storefront::config::StorefrontConfig::database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;
    Ok(PgStore::new(pool))
}
