//! `PgStore` against a live database.
//!
//! Ignored by default. Run with `STOREFRONT_DATABASE_URL` pointing at a
//! scratch database:
//!
//! ```bash
//! cargo test -p bazaar-integration-tests --test postgres -- --ignored
//! ```

use bazaar_core::{Email, Money, PageRequest, UserId};
use bazaar_storefront::db::{
    CartStore, OrderStore, PgStore, ProductStore, RepositoryError, UserStore,
};
use bazaar_storefront::models::{NewOrder, OrderLine, OrderedProduct, Product, ProductDraft};

async fn store() -> PgStore {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .expect("STOREFRONT_DATABASE_URL must be set for live database tests");
    let pool = sqlx::PgPool::connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    PgStore::new(pool)
}

fn unique_email() -> Email {
    Email::parse(&format!("pg-{}@example.com", uuid::Uuid::new_v4())).unwrap()
}

async fn user(store: &PgStore) -> UserId {
    store.create_user(&unique_email(), "hash").await.unwrap().id
}

async fn product(store: &PgStore, owner: UserId, price: &str) -> Product {
    let draft = ProductDraft {
        title: "Live Mug".to_owned(),
        price: Money::parse(price).unwrap(),
        description: "A mug from the database.".to_owned(),
        image_path: "live-mug.png".to_owned(),
    };
    store.create_product(owner, &draft).await.unwrap()
}

#[tokio::test]
#[ignore = "needs STOREFRONT_DATABASE_URL"]
async fn test_duplicate_email_conflicts() {
    let store = store().await;
    let email = unique_email();

    store.create_user(&email, "hash").await.unwrap();
    let err = store.create_user(&email, "hash").await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let (found, hash) = store.password_hash(&email).await.unwrap().unwrap();
    assert_eq!(found.email, email);
    assert_eq!(hash, "hash");
}

#[tokio::test]
#[ignore = "needs STOREFRONT_DATABASE_URL"]
async fn test_price_round_trips_exactly() {
    let store = store().await;
    let owner = user(&store).await;
    let created = product(&store, owner, "19.99").await;

    let loaded = store.product(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.price, Money::parse("19.99").unwrap());

    let page = store.products_page(PageRequest::new(1, 1)).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.window.total_items >= 1);
}

#[tokio::test]
#[ignore = "needs STOREFRONT_DATABASE_URL"]
async fn test_cart_increment_stops_at_limit() {
    let store = store().await;
    let buyer = user(&store).await;
    let item = product(&store, buyer, "2.00").await;

    assert!(store.increment_cart_item(buyer, item.id, 2).await.unwrap().is_some());
    assert!(store.increment_cart_item(buyer, item.id, 2).await.unwrap().is_some());
    assert!(store.increment_cart_item(buyer, item.id, 2).await.unwrap().is_none());
    assert_eq!(store.cart(buyer).await.unwrap().quantity_of(item.id), 2);

    store.delete_product(item.id, buyer).await.unwrap();
    assert!(store.cart(buyer).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "needs STOREFRONT_DATABASE_URL"]
async fn test_place_order_clears_cart() {
    let store = store().await;
    let buyer = user(&store).await;
    let email = store.user_by_id(buyer).await.unwrap().unwrap().email;
    let item = product(&store, buyer, "3.25").await;

    let cart = store.increment_cart_item(buyer, item.id, 99).await.unwrap().unwrap();
    let order = NewOrder {
        user_id: buyer,
        email,
        lines: vec![OrderLine {
            product: OrderedProduct::from(&item),
            quantity: 1,
        }],
    };

    let id = store.place_order(&order, &cart).await.unwrap();
    assert!(store.cart(buyer).await.unwrap().is_empty());

    let placed = store.order(id).await.unwrap().unwrap();
    assert_eq!(placed.user_id, buyer);
    assert_eq!(placed.total(), Money::parse("3.25").unwrap());

    // The cart no longer matches, so a replay is refused.
    let err = store.place_order(&order, &cart).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "needs STOREFRONT_DATABASE_URL"]
async fn test_item_added_after_snapshot_rolls_back_checkout() {
    let store = store().await;
    let buyer = user(&store).await;
    let email = store.user_by_id(buyer).await.unwrap().unwrap().email;
    let mug = product(&store, buyer, "3.25").await;
    let plate = product(&store, buyer, "5.00").await;

    let snapshot = store.increment_cart_item(buyer, mug.id, 99).await.unwrap().unwrap();
    store.increment_cart_item(buyer, plate.id, 99).await.unwrap().unwrap();

    let order = NewOrder {
        user_id: buyer,
        email,
        lines: vec![OrderLine {
            product: OrderedProduct::from(&mug),
            quantity: 1,
        }],
    };
    let err = store.place_order(&order, &snapshot).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let cart = store.cart(buyer).await.unwrap();
    assert_eq!(cart.quantity_of(mug.id), 1);
    assert_eq!(cart.quantity_of(plate.id), 1);
    assert!(store.orders_for_user(buyer).await.unwrap().is_empty());
}
