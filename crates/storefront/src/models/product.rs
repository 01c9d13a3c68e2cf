//! Product domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Money, ProductId, UserId};

/// A catalog product.
///
/// Products are the live source of truth for price and description. Carts
/// reference them by ID; orders copy their fields (see
/// [`OrderedProduct`](super::OrderedProduct)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    /// The user who created the product and may edit or delete it.
    pub owner_id: UserId,
    pub title: String,
    pub price: Money,
    pub description: String,
    /// Path of the image relative to the image store, e.g. `1700000000000-mug.png`.
    pub image_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// URL under which the image is served.
    #[must_use]
    pub fn image_url(&self) -> String {
        format!("/images/{}", self.image_path)
    }
}

/// Validated fields for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub title: String,
    pub price: Money,
    pub description: String,
    pub image_path: String,
}
