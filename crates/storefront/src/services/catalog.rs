//! Catalog browsing and product management.
//!
//! Anyone can browse. Signed-in users manage the products they created;
//! another user's product behaves as if it did not exist.

use thiserror::Error;

use bazaar_core::{Money, Page, PageRequest, ProductId};

use crate::db::{RepositoryError, Store};
use crate::models::{CurrentUser, Product, ProductDraft};

use super::uploads::{ImageStore, ImageUpload, UploadError};

const MIN_TITLE_LENGTH: usize = 3;
const MIN_DESCRIPTION_LENGTH: usize = 5;
const MAX_DESCRIPTION_LENGTH: usize = 360;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No such product, or it belongs to someone else.
    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// Form input failed validation.
    #[error("invalid product: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// A new product needs an image.
    #[error("attached file is not an image")]
    MissingImage,

    /// The image could not be stored.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Raw product form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInput {
    pub title: String,
    pub price: String,
    pub description: String,
}

struct ValidInput {
    title: String,
    price: Money,
    description: String,
}

impl ProductInput {
    /// Trim and check every field, collecting all messages.
    fn validate(&self) -> Result<ValidInput, CatalogError> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.chars().count() < MIN_TITLE_LENGTH {
            errors.push(format!(
                "Title must be at least {MIN_TITLE_LENGTH} characters."
            ));
        }

        let price = Money::parse(&self.price).map_err(|_| {
            errors.push("Price must be a non-negative number.".to_owned());
        });

        let description = self.description.trim();
        let length = description.chars().count();
        if !(MIN_DESCRIPTION_LENGTH..=MAX_DESCRIPTION_LENGTH).contains(&length) {
            errors.push(format!(
                "Description must be {MIN_DESCRIPTION_LENGTH} to {MAX_DESCRIPTION_LENGTH} characters."
            ));
        }

        match price {
            Ok(price) if errors.is_empty() => Ok(ValidInput {
                title: title.to_owned(),
                price,
                description: description.to_owned(),
            }),
            _ => Err(CatalogError::Invalid(errors)),
        }
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
    images: &'a ImageStore,
    per_page: u32,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, images: &'a ImageStore, per_page: u32) -> Self {
        Self {
            store,
            images,
            per_page,
        }
    }

    /// Page request for a `?page=` query value, using the configured page size.
    #[must_use]
    pub fn page_request(&self, page: Option<u32>) -> PageRequest {
        PageRequest::new(page.unwrap_or(1), self.per_page)
    }

    /// One page of the catalog, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_products(&self, request: PageRequest) -> Result<Page<Product>, CatalogError> {
        Ok(self.store.products_page(request).await?)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .product(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// Products created by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn owned_products(&self, owner: &CurrentUser) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.products_by_owner(owner.id).await?)
    }

    /// A product `owner` may edit.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if it does not exist or is not theirs.
    pub async fn owned_product(
        &self,
        id: ProductId,
        owner: &CurrentUser,
    ) -> Result<Product, CatalogError> {
        self.store
            .product(id)
            .await?
            .filter(|p| p.owner_id == owner.id)
            .ok_or(CatalogError::NotFound(id))
    }

    /// Create a product with an image.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad fields, `CatalogError::MissingImage`
    /// without an image, and `CatalogError::Upload` for rejected image types.
    pub async fn add_product(
        &self,
        owner: &CurrentUser,
        input: &ProductInput,
        image: Option<&ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let valid = input.validate()?;
        let image = image.ok_or(CatalogError::MissingImage)?;
        let image_path = self.images.save_upload(image).await?;

        let draft = ProductDraft {
            title: valid.title,
            price: valid.price,
            description: valid.description,
            image_path,
        };

        match self.store.create_product(owner.id, &draft).await {
            Ok(product) => {
                tracing::info!(product_id = %product.id, owner = %owner.id, "Product created");
                Ok(product)
            }
            Err(e) => {
                self.discard_image(&draft.image_path).await;
                Err(e.into())
            }
        }
    }

    /// Replace a product's fields; a new image replaces the old file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is not `owner`'s, and
    /// validation or upload errors as for [`add_product`](Self::add_product).
    pub async fn update_product(
        &self,
        id: ProductId,
        owner: &CurrentUser,
        input: &ProductInput,
        image: Option<&ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let valid = input.validate()?;
        let existing = self.owned_product(id, owner).await?;

        let new_image = match image {
            Some(upload) => Some(self.images.save_upload(upload).await?),
            None => None,
        };

        let draft = ProductDraft {
            title: valid.title,
            price: valid.price,
            description: valid.description,
            image_path: new_image
                .clone()
                .unwrap_or_else(|| existing.image_path.clone()),
        };

        let updated = match self.store.update_product(id, owner.id, &draft).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                if let Some(path) = &new_image {
                    self.discard_image(path).await;
                }
                return Err(CatalogError::NotFound(id));
            }
            Err(e) => {
                if let Some(path) = &new_image {
                    self.discard_image(path).await;
                }
                return Err(e.into());
            }
        };

        if new_image.is_some() {
            self.discard_image(&existing.image_path).await;
        }

        tracing::info!(product_id = %id, owner = %owner.id, "Product updated");
        Ok(updated)
    }

    /// Delete one of `owner`'s products and its image.
    ///
    /// Cart items for the product disappear with it; orders keep their copy.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is not `owner`'s.
    pub async fn delete_product(
        &self,
        id: ProductId,
        owner: &CurrentUser,
    ) -> Result<(), CatalogError> {
        let deleted = self
            .store
            .delete_product(id, owner.id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        self.discard_image(&deleted.image_path).await;

        tracing::info!(product_id = %id, owner = %owner.id, "Product deleted");
        Ok(())
    }

    async fn discard_image(&self, path: &str) {
        if let Err(e) = self.images.delete(path).await {
            tracing::warn!(file = %path, error = %e, "Failed to delete product image");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{CartStore, MemoryStore};
    use crate::services::{CartService, testing};

    fn images() -> ImageStore {
        ImageStore::new(std::env::temp_dir().join(format!("bazaar-catalog-{}", uuid::Uuid::new_v4())))
    }

    fn input(title: &str, price: &str, description: &str) -> ProductInput {
        ProductInput {
            title: title.to_owned(),
            price: price.to_owned(),
            description: description.to_owned(),
        }
    }

    fn png(name: &str) -> ImageUpload {
        ImageUpload {
            content_type: "image/png".to_owned(),
            file_name: name.to_owned(),
            bytes: b"png".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_pages_of_five_products() {
        let store = MemoryStore::new();
        let owner = testing::user(&store, "owner@example.com").await;
        for title in ["One", "Two", "Three", "Four", "Five"] {
            testing::product(&store, &owner, title, "1.00").await;
        }
        let images = images();
        let catalog = CatalogService::new(&store, &images, 2);

        let first = catalog.list_products(catalog.page_request(None)).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.window.has_next_page);
        assert!(!first.window.has_previous_page);

        let third = catalog.list_products(catalog.page_request(Some(3))).await.unwrap();
        assert_eq!(third.items.len(), 1);
        assert_eq!(third.items[0].title, "Five");
        assert!(!third.window.has_next_page);
        assert_eq!(third.window.last_page, 3);

        let beyond = catalog.list_products(catalog.page_request(Some(4))).await.unwrap();
        assert!(beyond.items.is_empty());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let err = input("ab", "-3", "tiny").validate().err().unwrap();
        let CatalogError::Invalid(messages) = err else {
            panic!("expected validation error");
        };
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn test_validation_trims() {
        let valid = input("  Mug  ", " 4.5 ", "  A sturdy mug  ").validate().unwrap();
        assert_eq!(valid.title, "Mug");
        assert_eq!(valid.price, Money::parse("4.50").unwrap());
        assert_eq!(valid.description, "A sturdy mug");
    }

    #[tokio::test]
    async fn test_add_requires_image() {
        let store = MemoryStore::new();
        let owner = testing::user(&store, "owner@example.com").await;
        let images = images();
        let catalog = CatalogService::new(&store, &images, 2);

        let err = catalog
            .add_product(&owner, &input("Mug", "4.50", "A sturdy mug"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingImage));
    }

    #[tokio::test]
    async fn test_edit_replaces_image_and_checks_owner() {
        let store = MemoryStore::new();
        let owner = testing::user(&store, "owner@example.com").await;
        let other = testing::user(&store, "other@example.com").await;
        let images = images();
        let catalog = CatalogService::new(&store, &images, 2);

        let product = catalog
            .add_product(&owner, &input("Mug", "4.50", "A sturdy mug"), Some(&png("mug.png")))
            .await
            .unwrap();
        let old_image = images.dir().join(&product.image_path);
        assert!(old_image.exists());

        let err = catalog
            .update_product(product.id, &other, &input("Cup", "1", "Not mine"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));

        let updated = catalog
            .update_product(
                product.id,
                &owner,
                &input("Big Mug", "5.00", "A larger mug"),
                Some(&png("big.png")),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Big Mug");
        assert!(updated.image_path.ends_with("-big.png"));
        assert!(!old_image.exists());

        tokio::fs::remove_dir_all(images.dir()).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_clears_carts() {
        let store = MemoryStore::new();
        let owner = testing::user(&store, "owner@example.com").await;
        let shopper = testing::user(&store, "shopper@example.com").await;
        let images = images();
        let catalog = CatalogService::new(&store, &images, 2);
        let product = catalog
            .add_product(&owner, &input("Mug", "4.50", "A sturdy mug"), Some(&png("mug.png")))
            .await
            .unwrap();
        CartService::new(&store, 99)
            .add_to_cart(&shopper, product.id)
            .await
            .unwrap();

        let err = catalog.delete_product(product.id, &shopper).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));

        catalog.delete_product(product.id, &owner).await.unwrap();
        assert!(store.cart(shopper.id).await.unwrap().is_empty());
        assert!(!images.dir().join(&product.image_path).exists());

        tokio::fs::remove_dir_all(images.dir()).await.unwrap();
    }
}
