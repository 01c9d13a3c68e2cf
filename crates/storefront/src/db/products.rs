//! `PostgreSQL` product repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bazaar_core::{Money, Page, PageRequest, ProductId, UserId};

use super::{PgStore, ProductStore, RepositoryError};
use crate::models::{Product, ProductDraft};

const PRODUCT_COLUMNS: &str =
    "id, owner_id, title, price, description, image_path, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    owner_id: UserId,
    title: String,
    price: Decimal,
    description: String,
    image_path: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Money::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            price,
            description: row.description,
            image_path: row.image_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl ProductStore for PgStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn products_page(&self, request: PageRequest) -> Result<Page<Product>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.product")
            .fetch_one(self.pool())
            .await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(to_i64(request.limit()))
        .bind(to_i64(request.offset()))
        .fetch_all(self.pool())
        .await?;

        let items = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let total = u64::try_from(total)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count: {total}")))?;

        Ok(Page::new(items, request, total))
    }

    async fn products_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
    }

    async fn create_product(
        &self,
        owner: UserId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.product (owner_id, title, price, description, image_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(owner)
        .bind(&draft.title)
        .bind(draft.price.amount())
        .bind(&draft.description)
        .bind(&draft.image_path)
        .fetch_one(self.pool())
        .await?;

        Product::try_from(row)
    }

    async fn update_product(
        &self,
        id: ProductId,
        owner: UserId,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.product
            SET title = $3, price = $4, description = $5, image_path = $6, updated_at = now()
            WHERE id = $1 AND owner_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(owner)
        .bind(&draft.title)
        .bind(draft.price.amount())
        .bind(&draft.description)
        .bind(&draft.image_path)
        .fetch_optional(self.pool())
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn delete_product(
        &self,
        id: ProductId,
        owner: UserId,
    ) -> Result<Option<Product>, RepositoryError> {
        // cart_item rows go with it (ON DELETE CASCADE)
        sqlx::query_as::<_, ProductRow>(&format!(
            r"
            DELETE FROM storefront.product
            WHERE id = $1 AND owner_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool())
        .await?
        .map(Product::try_from)
        .transpose()
    }
}
