//! In-memory [`Store`] for tests and local demos.
//!
//! All state sits behind one `tokio::sync::Mutex`, so every trait method is a
//! single critical section. That gives the same atomicity the Postgres store
//! gets from upserts and transactions.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use bazaar_core::{Email, OrderId, Page, PageRequest, ProductId, UserId};

use super::{CartStore, OrderStore, ProductStore, RepositoryError, Store, UserStore};
use crate::models::{Cart, NewOrder, Order, Product, ProductDraft, User};

struct UserRecord {
    user: User,
    password_hash: String,
    reset: Option<(String, DateTime<Utc>)>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<UserId, UserRecord>,
    products: BTreeMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: BTreeMap<OrderId, Order>,
    next_id: i64,
}

impl Inner {
    const fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A [`Store`] kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&id).map(|r| r.user.clone()))
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|r| &r.user.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(inner.next_id()),
            email: email.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
                reset: None,
            },
        );
        Ok(user)
    }

    async fn password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn store_reset_token(
        &self,
        user_id: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .users
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;
        record.reset = Some((token_digest.to_owned(), expires_at));
        Ok(())
    }

    async fn user_by_reset_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|r| {
                r.reset
                    .as_ref()
                    .is_some_and(|(digest, expires)| digest == token_digest && *expires > now)
            })
            .map(|r| r.user.clone()))
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .users
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut record.password_hash);
        record.reset = None;
        record.user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.products.get(&id).cloned())
    }

    async fn products_page(&self, request: PageRequest) -> Result<Page<Product>, RepositoryError> {
        let inner = self.inner.lock().await;
        let all: Vec<Product> = inner.products.values().cloned().collect();
        Ok(Page::from_slice(&all, request))
    }

    async fn products_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .products
            .values()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn create_product(
        &self,
        owner: UserId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&owner) {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(inner.next_id()),
            owner_id: owner,
            title: draft.title.clone(),
            price: draft.price,
            description: draft.description.clone(),
            image_path: draft.image_path.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        owner: UserId,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let Some(product) = inner.products.get_mut(&id).filter(|p| p.owner_id == owner) else {
            return Ok(None);
        };

        product.title.clone_from(&draft.title);
        product.price = draft.price;
        product.description.clone_from(&draft.description);
        product.image_path.clone_from(&draft.image_path);
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(
        &self,
        id: ProductId,
        owner: UserId,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if !inner.products.get(&id).is_some_and(|p| p.owner_id == owner) {
            return Ok(None);
        }

        let removed = inner.products.remove(&id);
        for cart in inner.carts.values_mut() {
            cart.remove(id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.carts.get(&user_id).cloned().unwrap_or_default())
    }

    async fn increment_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        max_quantity: u32,
    ) -> Result<Option<Cart>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if !inner.products.contains_key(&product_id) || !inner.users.contains_key(&user_id) {
            return Err(RepositoryError::NotFound);
        }

        let cart = inner.carts.entry(user_id).or_default();
        if !cart.increment(product_id, max_quantity) {
            return Ok(None);
        }
        Ok(Some(cart.clone()))
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let cart = inner.carts.entry(user_id).or_default();
        cart.remove(product_id);
        Ok(cart.clone())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.carts.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(
        &self,
        order: &NewOrder,
        expected: &Cart,
    ) -> Result<OrderId, RepositoryError> {
        let mut inner = self.inner.lock().await;

        let current = inner.carts.get(&order.user_id).cloned().unwrap_or_default();
        if current.items() != expected.items() {
            return Err(RepositoryError::Conflict(
                "cart changed during checkout".to_owned(),
            ));
        }

        let id = OrderId::new(inner.next_id());
        inner.orders.insert(
            id,
            Order {
                id,
                user_id: order.user_id,
                email: order.email.clone(),
                lines: order.lines.clone(),
                created_at: Utc::now(),
            },
        );
        inner.carts.remove(&order.user_id);
        Ok(id)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.lock().await;
        // Later IDs are newer.
        Ok(inner
            .orders
            .values()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.get(&id).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::Money;

    use super::*;

    async fn seeded() -> (MemoryStore, User, Product) {
        let store = MemoryStore::new();
        let user = store
            .create_user(&Email::parse("owner@example.com").unwrap(), "hash")
            .await
            .unwrap();
        let product = store
            .create_product(
                user.id,
                &ProductDraft {
                    title: "Mug".to_owned(),
                    price: Money::parse("4.50").unwrap(),
                    description: "A sturdy mug".to_owned(),
                    image_path: "1-mug.png".to_owned(),
                },
            )
            .await
            .unwrap();
        (store, user, product)
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (store, user, _) = seeded().await;
        let err = store.create_user(&user.email, "other").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_increment_unknown_product_is_not_found() {
        let (store, user, _) = seeded().await;
        let err = store
            .increment_cart_item(user.id, ProductId::new(999), 99)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_product_removes_cart_items() {
        let (store, user, product) = seeded().await;
        store
            .increment_cart_item(user.id, product.id, 99)
            .await
            .unwrap();

        let deleted = store.delete_product(product.id, user.id).await.unwrap();
        assert_eq!(deleted.map(|p| p.id), Some(product.id));
        assert!(store.cart(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_product_of_other_owner_is_refused() {
        let (store, _, product) = seeded().await;
        let other = store
            .create_user(&Email::parse("other@example.com").unwrap(), "hash")
            .await
            .unwrap();

        assert!(store.delete_product(product.id, other.id).await.unwrap().is_none());
        assert!(store.product(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_place_order_rejects_stale_cart() {
        let (store, user, product) = seeded().await;
        let snapshot = store
            .increment_cart_item(user.id, product.id, 99)
            .await
            .unwrap()
            .unwrap();
        store
            .increment_cart_item(user.id, product.id, 99)
            .await
            .unwrap();

        let order = NewOrder {
            user_id: user.id,
            email: user.email.clone(),
            lines: vec![],
        };
        let err = store.place_order(&order, &snapshot).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.cart(user.id).await.unwrap().quantity_of(product.id), 2);
    }

    #[tokio::test]
    async fn test_expired_reset_token_is_ignored() {
        let (store, user, _) = seeded().await;
        let now = Utc::now();
        store
            .store_reset_token(user.id, "digest", now - chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert!(store.user_by_reset_token("digest", now).await.unwrap().is_none());
    }
}
