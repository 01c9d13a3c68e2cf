//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Shop index (paginated catalog)
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (store reachable)
//!
//! # Catalog
//! GET  /products                  - Product listing
//! GET  /products/{id}             - Product detail
//!
//! # Cart (requires auth)
//! GET  /cart                      - Cart page
//! POST /cart                      - Add product
//! POST /cart-delete-item          - Remove product
//!
//! # Orders (requires auth)
//! GET  /checkout                  - Checkout summary
//! POST /create-order              - Place order
//! GET  /orders                    - Order history
//! GET  /orders/{id}               - Invoice PDF
//!
//! # Auth
//! GET  /login, POST /login
//! GET  /signup, POST /signup
//! POST /logout
//! GET  /reset, POST /reset        - Request reset email
//! GET  /reset/{token}             - New password form
//! POST /new-password              - Set new password
//!
//! # Admin (requires auth, own products only)
//! GET  /admin/add-product, POST /admin/add-product
//! GET  /admin/products
//! GET  /admin/edit-product/{id}, POST /admin/edit-product
//! DELETE /admin/product/{id}      - JSON reply
//!
//! # Errors
//! GET  /500                       - Generic error page
//! *                               - 404 fallback
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod errors;
pub mod health;
pub mod orders;
pub mod shop;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

use crate::models::CurrentUser;
use crate::state::AppState;

/// Page metadata every template receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    /// Path of the current page, used to highlight navigation.
    pub path: String,
    pub is_authenticated: bool,
}

impl PageMeta {
    /// Metadata for an anonymous visitor.
    #[must_use]
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            is_authenticated: false,
        }
    }

    /// Mark the page as rendered for a signed-in user (or not).
    #[must_use]
    pub const fn with_user(mut self, user: Option<&CurrentUser>) -> Self {
        self.is_authenticated = user.is_some();
        self
    }

    /// Metadata for a page that always requires a signed-in user.
    #[must_use]
    pub fn authenticated(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            ..Self::new(title, path)
        }
    }

    /// Whether `prefix` is the active navigation section.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.path == "/"
        } else {
            self.path.starts_with(prefix)
        }
    }
}

/// Create the catalog routes router.
fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::index))
        .route("/products", get(shop::products))
        .route("/products/{id}", get(shop::product))
}

/// Create the cart and order routes router.
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).post(cart::add))
        .route("/cart-delete-item", post(cart::remove))
        .route("/checkout", get(orders::checkout))
        .route("/create-order", post(orders::create))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::invoice))
}

/// Create the auth routes router.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        .route("/reset", get(auth::reset_page).post(auth::reset))
        .route("/reset/{token}", get(auth::new_password_page))
        .route("/new-password", post(auth::new_password))
}

/// Largest accepted product form, image included.
const MAX_PRODUCT_FORM_BYTES: usize = 10 * 1024 * 1024;

/// Create the product administration routes router.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/add-product",
            get(admin::add_product_page).post(admin::add_product),
        )
        .route("/products", get(admin::products))
        .route("/edit-product/{id}", get(admin::edit_product_page))
        .route("/edit-product", post(admin::edit_product))
        .route("/product/{id}", delete(admin::delete_product))
        .layer(DefaultBodyLimit::max(MAX_PRODUCT_FORM_BYTES))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(shop_routes())
        .merge(order_routes())
        .merge(auth_routes())
        .nest("/admin", admin_routes())
        .route("/500", get(errors::server_error))
        .fallback(errors::not_found)
}
