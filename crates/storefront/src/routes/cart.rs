//! Cart route handlers.
//!
//! The cart lives in the store, keyed by the signed-in user, so every
//! handler here requires authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CartLine;
use crate::routes::PageMeta;
use crate::services::CartView;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub title: String,
    pub image_url: String,
    pub quantity: u32,
    pub price: String,
    pub subtotal: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            title: line.product.title.clone(),
            image_url: line.product.image_url(),
            quantity: line.quantity,
            price: line.product.price.to_string(),
            subtotal: line.subtotal().to_string(),
        }
    }
}

/// Lines and total for the cart and checkout templates.
pub(crate) fn line_views(cart: &CartView) -> (Vec<CartLineView>, String) {
    (
        cart.lines.iter().map(CartLineView::from).collect(),
        cart.total().to_string(),
    )
}

/// Form naming a single product.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub product_id: String,
}

impl ProductForm {
    pub(crate) fn product_id(&self) -> Result<ProductId> {
        self.product_id
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid product.".to_owned()))
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/cart.html")]
pub struct CartTemplate {
    pub meta: PageMeta,
    pub lines: Vec<CartLineView>,
    pub total: String,
}

/// Display the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<CartTemplate> {
    let cart = state.carts().cart_view(&user).await?;
    let (lines, total) = line_views(&cart);

    Ok(CartTemplate {
        meta: PageMeta::authenticated("Your Cart", "/cart"),
        lines,
        total,
    })
}

/// Add one unit of a product, then show the cart.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let product_id = form.product_id()?;
    let cart = state.carts().add_to_cart(&user, product_id).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", product_id.to_string()),
            ("quantity", cart.quantity_of(product_id).to_string()),
        ],
    );

    Ok(Redirect::to("/cart"))
}

/// Remove a product from the cart. Absent products are ignored.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let product_id = form.product_id()?;
    state.carts().remove_from_cart(&user, product_id).await?;

    Ok(Redirect::to("/cart"))
}
