//! Cart domain types.
//!
//! A [`Cart`] holds product references and quantities only. Prices are
//! resolved against live [`Product`] data when the cart is viewed or checked
//! out, producing [`CartLine`]s.

use bazaar_core::{Money, ProductId};

use super::Product;

/// One product reference in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: u32,
}

/// A user's cart: at most one item per product, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Build a cart from stored items, merging duplicates into the first
    /// occurrence.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::default();
        for item in items {
            match cart.position(item.product_id) {
                Some(index) => {
                    if let Some(existing) = cart.items.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity);
                    }
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity held for `product_id`, or 0.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Increment the quantity of `product_id` by one, appending it if absent.
    ///
    /// Returns `false` and leaves the cart unchanged when the item is already
    /// at `max_quantity`.
    pub fn increment(&mut self, product_id: ProductId, max_quantity: u32) -> bool {
        match self.position(product_id) {
            Some(index) => match self.items.get_mut(index) {
                Some(item) if item.quantity < max_quantity => {
                    item.quantity += 1;
                    true
                }
                _ => false,
            },
            None if max_quantity >= 1 => {
                self.items.push(CartItem {
                    product_id,
                    quantity: 1,
                });
                true
            }
            None => false,
        }
    }

    /// Drop the item for `product_id`. Absent products are a no-op.
    pub fn remove(&mut self, product_id: ProductId) {
        self.items.retain(|item| item.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_id == product_id)
    }
}

/// A cart item resolved against current product data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// `quantity x price` at today's price.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pid(id: i64) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn test_increment_appends_then_counts() {
        let mut cart = Cart::default();
        assert!(cart.increment(pid(1), 99));
        assert!(cart.increment(pid(2), 99));
        assert!(cart.increment(pid(1), 99));

        assert_eq!(
            cart.items(),
            &[
                CartItem { product_id: pid(1), quantity: 2 },
                CartItem { product_id: pid(2), quantity: 1 },
            ]
        );
    }

    #[test]
    fn test_increment_respects_limit() {
        let mut cart = Cart::default();
        assert!(cart.increment(pid(1), 2));
        assert!(cart.increment(pid(1), 2));
        assert!(!cart.increment(pid(1), 2));
        assert_eq!(cart.quantity_of(pid(1)), 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::default();
        cart.increment(pid(1), 99);
        let before = cart.clone();
        cart.remove(pid(7));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_from_items_merges_duplicates() {
        let cart = Cart::from_items([
            CartItem { product_id: pid(3), quantity: 1 },
            CartItem { product_id: pid(4), quantity: 2 },
            CartItem { product_id: pid(3), quantity: 5 },
        ]);
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.quantity_of(pid(3)), 6);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// However adds are interleaved, each product appears once with a
        /// quantity equal to the number of adds for it.
        #[test]
        fn adds_collapse_to_one_item_per_product(adds in proptest::collection::vec(1i64..6, 0..40)) {
            let mut cart = Cart::default();
            for id in &adds {
                prop_assert!(cart.increment(pid(*id), u32::MAX));
            }

            for id in 1i64..6 {
                let expected = adds.iter().filter(|a| **a == id).count();
                prop_assert_eq!(cart.quantity_of(pid(id)) as usize, expected);
                prop_assert!(cart.items().iter().filter(|i| i.product_id == pid(id)).count() <= 1);
            }
        }
    }
}
