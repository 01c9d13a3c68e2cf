//! `PostgreSQL` cart repository.
//!
//! Cart items are rows of `storefront.cart_item`, unique per
//! `(user_id, product_id)` and ordered by their serial ID. Adding to the cart
//! is a single upsert so concurrent adds are never lost.

use async_trait::async_trait;
use sqlx::PgExecutor;

use bazaar_core::{ProductId, UserId};

use super::{CartStore, PgStore, RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{Cart, CartItem};

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: ProductId,
    quantity: i32,
}

/// Load a cart with any executor, so checkout can read inside its transaction.
pub(super) async fn load_cart<'e>(
    executor: impl PgExecutor<'e>,
    user_id: UserId,
) -> Result<Cart, RepositoryError> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        r"
        SELECT product_id, quantity
        FROM storefront.cart_item
        WHERE user_id = $1
        ORDER BY id
        ",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| {
            Ok(CartItem {
                product_id: row.product_id,
                quantity: quantity_from_db(row.quantity)?,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    Ok(Cart::from_items(items))
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        load_cart(self.pool(), user_id).await
    }

    async fn increment_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        max_quantity: u32,
    ) -> Result<Option<Cart>, RepositoryError> {
        let max_quantity = quantity_to_db(max_quantity)?;

        // No row comes back when the conflicting item is already at the limit.
        let updated: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO storefront.cart_item (user_id, product_id, quantity)
            SELECT $1, $2, 1
            WHERE $3 >= 1
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = storefront.cart_item.quantity + 1
            WHERE storefront.cart_item.quantity < $3
            RETURNING quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(max_quantity)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            e => RepositoryError::Database(e),
        })?;

        if updated.is_none() {
            return Ok(None);
        }

        Ok(Some(load_cart(self.pool(), user_id).await?))
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool())
            .await?;

        load_cart(self.pool(), user_id).await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(())
    }
}
