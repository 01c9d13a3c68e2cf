//! Checkout and order history.
//!
//! Checkout copies each product's current fields into the order. The order
//! insert and the cart clear happen in one store transaction that also checks
//! the cart still matches what was read.

use thiserror::Error;

use bazaar_core::{OrderId, ProductId};

use crate::db::{RepositoryError, Store};
use crate::models::{CurrentUser, NewOrder, Order, OrderLine, OrderedProduct};

/// Errors that can occur during checkout or order lookup.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// A product in the cart no longer exists.
    #[error("product {0} is no longer available")]
    ProductUnavailable(ProductId),

    /// The cart was modified between reading it and placing the order.
    #[error("cart changed during checkout")]
    CartChanged,

    /// No order with this ID.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The order belongs to another user.
    #[error("order belongs to another user")]
    Forbidden,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Turn the user's cart into an order and empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` if the cart holds nothing.
    /// Returns `OrderError::ProductUnavailable` if a cart product was deleted.
    /// Returns `OrderError::CartChanged` if the cart changed concurrently; no
    /// order is written and the cart keeps its new contents.
    pub async fn place_order(&self, user: &CurrentUser) -> Result<OrderId, OrderError> {
        let cart = self.store.cart(user.id).await?;
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let product = self
                .store
                .product(item.product_id)
                .await?
                .ok_or(OrderError::ProductUnavailable(item.product_id))?;

            lines.push(OrderLine {
                product: OrderedProduct::from(&product),
                quantity: item.quantity,
            });
        }

        let order = NewOrder {
            user_id: user.id,
            email: user.email.clone(),
            lines,
        };

        let order_id = self
            .store
            .place_order(&order, &cart)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(reason) => {
                    tracing::info!(user_id = %user.id, %reason, "Checkout raced a cart change");
                    OrderError::CartChanged
                }
                other => OrderError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, order_id = %order_id, "Order placed");
        Ok(order_id)
    }

    /// All orders of the user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_orders(&self, user: &CurrentUser) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.orders_for_user(user.id).await?)
    }

    /// Fetch an order the requester owns.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no such order exists.
    /// Returns `OrderError::Forbidden` if it belongs to someone else.
    pub async fn get_order(
        &self,
        order_id: OrderId,
        requester: &CurrentUser,
    ) -> Result<Order, OrderError> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        if order.user_id != requester.id {
            tracing::warn!(
                order_id = %order_id,
                requester = %requester.id,
                "Order requested by non-owner"
            );
            return Err(OrderError::Forbidden);
        }

        Ok(order)
    }
}
