//! `PostgreSQL` order repository.
//!
//! Placing an order inserts the order and its lines and empties the cart in
//! one transaction. Each cart row is deleted only if it still holds the
//! quantity that was snapshotted, so a concurrent add or a second checkout
//! rolls the whole transaction back.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bazaar_core::{Email, Money, OrderId, ProductId, UserId};

use super::carts::load_cart;
use super::{OrderStore, PgStore, RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{Cart, NewOrder, Order, OrderLine, OrderedProduct};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    product_id: ProductId,
    title: String,
    price: Decimal,
    description: String,
    image_path: String,
    quantity: i32,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let price = Money::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price on order {}: {e}", row.order_id))
        })?;

        Ok(Self {
            product: OrderedProduct {
                product_id: row.product_id,
                title: row.title,
                price,
                description: row.description,
                image_path: row.image_path,
            },
            quantity: quantity_from_db(row.quantity)?,
        })
    }
}

fn assemble(row: OrderRow, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
    let email = Email::parse(&row.email).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email on order {}: {e}", row.id))
    })?;

    Ok(Order {
        id: row.id,
        user_id: row.user_id,
        email,
        lines,
        created_at: row.created_at,
    })
}

impl PgStore {
    async fn lines_for(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        let ids: Vec<i64> = order_ids.iter().map(OrderId::as_i64).collect();

        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT order_id, product_id, title, price, description, image_path, quantity
            FROM storefront.order_line
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await?;

        let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            lines
                .entry(order_id)
                .or_default()
                .push(OrderLine::try_from(row)?);
        }
        Ok(lines)
    }
}

/// Stored position of the order line at `index`.
fn line_position(index: usize) -> Result<i32, RepositoryError> {
    i32::try_from(index)
        .map_err(|_| RepositoryError::DataCorruption(format!("order line index out of range: {index}")))
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(
        &self,
        order: &NewOrder,
        expected: &Cart,
    ) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let order_id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO storefront.order (user_id, email)
            VALUES ($1, $2)
            RETURNING id
            ",
        )
        .bind(order.user_id)
        .bind(order.email.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for (index, line) in order.lines.iter().enumerate() {
            let position = line_position(index)?;

            sqlx::query(
                r"
                INSERT INTO storefront.order_line
                    (order_id, position, product_id, title, price, description, image_path, quantity)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(order_id)
            .bind(position)
            .bind(line.product.product_id)
            .bind(&line.product.title)
            .bind(line.product.price.amount())
            .bind(&line.product.description)
            .bind(&line.product.image_path)
            .bind(quantity_to_db(line.quantity)?)
            .execute(&mut *tx)
            .await?;
        }

        for item in expected.items() {
            let deleted = sqlx::query(
                r"
                DELETE FROM storefront.cart_item
                WHERE user_id = $1 AND product_id = $2 AND quantity = $3
                ",
            )
            .bind(order.user_id)
            .bind(item.product_id)
            .bind(quantity_to_db(item.quantity)?)
            .execute(&mut *tx)
            .await?;

            if deleted.rows_affected() != 1 {
                return Err(RepositoryError::Conflict(format!(
                    "cart item for product {} changed during checkout",
                    item.product_id
                )));
            }
        }

        if !load_cart(&mut *tx, order.user_id).await?.is_empty() {
            return Err(RepositoryError::Conflict(
                "items were added to the cart during checkout".to_owned(),
            ));
        }

        tx.commit().await?;

        Ok(order_id)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, email, created_at
            FROM storefront.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let ids: Vec<OrderId> = rows.iter().map(|row| row.id).collect();
        let mut lines = self.lines_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let order_lines = lines.remove(&row.id).unwrap_or_default();
                assemble(row, order_lines)
            })
            .collect()
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, email, created_at
            FROM storefront.order
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines = self.lines_for(&[row.id]).await?.remove(&row.id).unwrap_or_default();
        assemble(row, lines).map(Some)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_position_keeps_small_indexes() {
        assert_eq!(line_position(0).unwrap(), 0);
        assert_eq!(line_position(41).unwrap(), 41);
    }

    #[test]
    fn test_line_position_overflow_is_corruption_not_conflict() {
        let err = line_position(usize::MAX).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }
}
