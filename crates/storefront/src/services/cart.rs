//! Cart operations.
//!
//! The cart stores product IDs and quantities only; prices come from the
//! live product every time the cart is shown.

use thiserror::Error;

use bazaar_core::{Money, ProductId};

use crate::db::{RepositoryError, Store};
use crate::models::{Cart, CartLine, CurrentUser};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist (or was deleted).
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The item already holds the maximum quantity.
    #[error("at most {max} of one product fit in a cart")]
    QuantityLimit { max: u32 },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart resolved against current product data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartView {
    pub lines: Vec<CartLine>,
}

impl CartView {
    /// Sum of line subtotals at current prices.
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn Store,
    max_quantity: u32,
}

impl<'a> CartService<'a> {
    /// Create a cart service capping each item at `max_quantity`.
    #[must_use]
    pub const fn new(store: &'a dyn Store, max_quantity: u32) -> Self {
        Self {
            store,
            max_quantity,
        }
    }

    /// Add one unit of a product to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    /// Returns `CartError::QuantityLimit` if the item is already at the cap;
    /// the cart is then unchanged.
    pub async fn add_to_cart(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        self.store
            .product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        let cart = self
            .store
            .increment_cart_item(user.id, product_id, self.max_quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::ProductNotFound(product_id),
                other => CartError::Repository(other),
            })?
            .ok_or(CartError::QuantityLimit {
                max: self.max_quantity,
            })?;

        tracing::debug!(user_id = %user.id, product_id = %product_id, "Added to cart");
        Ok(cart)
    }

    /// Remove a product from the user's cart. Absent products are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn remove_from_cart(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        Ok(self.store.remove_cart_item(user.id, product_id).await?)
    }

    /// Empty the user's cart.
    ///
    /// Checkout does not need this; the order store clears the cart inside
    /// its own transaction.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn clear_cart(&self, user: &CurrentUser) -> Result<(), CartError> {
        Ok(self.store.clear_cart(user.id).await?)
    }

    /// Resolve the user's cart to current product data.
    ///
    /// Items whose product has been deleted are left out.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn cart_view(&self, user: &CurrentUser) -> Result<CartView, CartError> {
        let cart = self.store.cart(user.id).await?;

        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            match self.store.product(item.product_id).await? {
                Some(product) => lines.push(CartLine {
                    product,
                    quantity: item.quantity,
                }),
                None => {
                    tracing::warn!(
                        user_id = %user.id,
                        product_id = %item.product_id,
                        "Cart references a missing product"
                    );
                }
            }
        }

        Ok(CartView { lines })
    }
}
