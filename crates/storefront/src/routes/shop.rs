//! Catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{PageWindow, ProductId};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Product;
use crate::routes::PageMeta;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub title: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            image_url: product.image_url(),
        }
    }
}

/// Pagination query parameters.
///
/// Kept as text so `?page=abc` falls back to the first page instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    fn page(&self) -> Option<u32> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }
}

/// Paginated product grid, used by both `/` and `/products`.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_list.html")]
pub struct ProductListTemplate {
    pub meta: PageMeta,
    pub heading: String,
    pub products: Vec<ProductView>,
    pub window: PageWindow,
}

/// Product detail page.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_detail.html")]
pub struct ProductDetailTemplate {
    pub meta: PageMeta,
    pub product: ProductView,
}

async fn product_list(
    state: &AppState,
    query: &PageQuery,
    meta: PageMeta,
    heading: &str,
) -> Result<ProductListTemplate> {
    let catalog = state.catalog();
    let page = catalog.list_products(catalog.page_request(query.page())).await?;

    Ok(ProductListTemplate {
        meta,
        heading: heading.to_owned(),
        products: page.items.iter().map(ProductView::from).collect(),
        window: page.window,
    })
}

/// Display the shop index.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<PageQuery>,
) -> Result<ProductListTemplate> {
    let meta = PageMeta::new("Shop", "/").with_user(user.as_ref());
    product_list(&state, &query, meta, "Shop").await
}

/// Display the product listing.
#[instrument(skip(state, user))]
pub async fn products(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<PageQuery>,
) -> Result<ProductListTemplate> {
    let meta = PageMeta::new("All Products", "/products").with_user(user.as_ref());
    product_list(&state, &query, meta, "All Products").await
}

/// Display one product.
#[instrument(skip(state, user))]
pub async fn product(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<ProductDetailTemplate> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("product {id}")))?;

    let product = state.catalog().product(id).await?;

    Ok(ProductDetailTemplate {
        meta: PageMeta::new(product.title.clone(), "/products").with_user(user.as_ref()),
        product: ProductView::from(&product),
    })
}
