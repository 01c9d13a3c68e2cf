//! Domain models for the storefront.
//!
//! These are validated domain types, separate from the row types used by
//! the Postgres store.
//!
//! - [`user`] - Shoppers (who also manage the products they create)
//! - [`product`] - Catalog entries, the live source of prices
//! - [`cart`] - The per-user mutable cart
//! - [`order`] - Immutable order snapshots
//! - [`session`] - Identity kept in the session cookie store

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartLine};
pub use order::{NewOrder, Order, OrderLine, OrderedProduct};
pub use product::{Product, ProductDraft};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
