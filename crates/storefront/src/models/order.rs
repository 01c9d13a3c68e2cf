//! Order domain types.
//!
//! An [`Order`] is a point-in-time copy of a cart. Each line carries an
//! [`OrderedProduct`] with the product fields as they were at checkout, so
//! later product edits or deletions never change an order.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, Money, OrderId, ProductId, UserId};

use super::Product;

/// Frozen copy of a product's fields at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedProduct {
    pub product_id: ProductId,
    pub title: String,
    pub price: Money,
    pub description: String,
    pub image_path: String,
}

impl From<&Product> for OrderedProduct {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            price: product.price,
            description: product.description.clone(),
            image_path: product.image_path.clone(),
        }
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product: OrderedProduct,
    pub quantity: u32,
}

impl OrderLine {
    /// `quantity x unit price` from the snapshot.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Email of the buyer at checkout time.
    pub email: Email,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }
}

/// An order about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub email: Email,
    pub lines: Vec<OrderLine>,
}
