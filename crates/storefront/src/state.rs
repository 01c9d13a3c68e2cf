//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Store;
use crate::services::{
    AuthService, CartService, CatalogService, ImageStore, InvoiceService, Mailer, OrderService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the data store, the mailer and configuration.
/// Services are built per request from borrowed state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    images: ImageStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Data store (Postgres in production, memory in tests)
    /// * `mailer` - Outgoing mail
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        let images = ImageStore::new(config.images_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                mailer,
                images,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the data store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the product image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.store(),
            self.inner.mailer.as_ref(),
            &self.inner.config.base_url,
        )
    }

    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(self.store(), self.inner.config.max_cart_quantity)
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(
            self.store(),
            &self.inner.images,
            self.inner.config.products_per_page,
        )
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store())
    }

    #[must_use]
    pub fn invoices(&self) -> InvoiceService<'_> {
        InvoiceService::new(self.store(), &self.inner.config.invoices_dir)
    }
}
