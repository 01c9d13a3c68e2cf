//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! owner: owner@example.com
//! products:
//!   - title: Red Mug
//!     price: 12.50
//!     description: A red mug that holds coffee.
//!     image: images/red-mug.png   # relative to the YAML file
//! ```
//!
//! Each product goes through the same validation and image handling as the
//! add-product form. The owner must already exist (`bazaar-cli user create`).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use bazaar_core::Email;
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::db::UserStore;
use bazaar_storefront::models::CurrentUser;
use bazaar_storefront::services::{CatalogService, ImageStore, ImageUpload, ProductInput};

use super::{CliError, connect};

/// A catalog seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub owner: String,
    pub products: Vec<SeedProduct>,
}

/// One product in a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub title: String,
    pub price: SeedPrice,
    pub description: String,
    pub image: PathBuf,
}

/// Prices may be written as YAML numbers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SeedPrice {
    Number(serde_yaml::Number),
    Text(String),
}

impl SeedPrice {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Content type for an image file, by extension.
fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Parse a seed file.
///
/// # Errors
///
/// Returns `CliError::Yaml` if the content does not match the schema.
pub fn parse(content: &str) -> Result<SeedFile, CliError> {
    Ok(serde_yaml::from_str(content)?)
}

async fn read_image(base: &Path, product: &SeedProduct) -> Result<ImageUpload, CliError> {
    let path = base.join(&product.image);
    let content_type = image_content_type(&path).ok_or_else(|| {
        CliError::Invalid(format!("{}: only PNG and JPEG images", path.display()))
    })?;
    let bytes = tokio::fs::read(&path).await.map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;

    Ok(ImageUpload {
        content_type: content_type.to_owned(),
        file_name: product
            .image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        bytes,
    })
}

/// Create every product in the file, owned by the file's `owner`.
///
/// Products that fail validation are logged and skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the owner does not
/// exist, or the database is unreachable.
pub async fn products(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: file_path.to_owned(),
            source,
        })?;
    let seed = parse(&content)?;
    info!(products = seed.products.len(), "Parsed seed file");

    let owner_email = Email::parse(&seed.owner).map_err(|e| CliError::Invalid(e.to_string()))?;

    let store = connect().await?;
    let owner = store
        .user_by_email(&owner_email)
        .await?
        .ok_or_else(|| CliError::Invalid(format!("no user with email {owner_email}")))?;
    let owner = CurrentUser::from(&owner);

    let images = ImageStore::new(StorefrontConfig::images_dir_from_env());
    let catalog = CatalogService::new(&store, &images, 1);
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut created = 0usize;
    for product in &seed.products {
        let image = read_image(base, product).await?;
        let input = ProductInput {
            title: product.title.clone(),
            price: product.price.as_text(),
            description: product.description.clone(),
        };

        match catalog.add_product(&owner, &input, Some(&image)).await {
            Ok(created_product) => {
                created += 1;
                info!(product_id = %created_product.id, title = %created_product.title, "Seeded product");
            }
            Err(e) => error!(title = %product.title, error = %e, "Skipping product"),
        }
    }

    info!("Seeding complete!");
    info!("  Products created: {created}");
    info!("  Products skipped: {}", seed.products.len() - created);
    Ok(())
}
