//! Checkout, order history and invoice handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use bazaar_core::OrderId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderLine};
use crate::routes::PageMeta;
use crate::routes::cart::{CartLineView, line_views};
use crate::services::IssuedInvoice;
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub title: String,
    pub quantity: u32,
    pub price: String,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            title: line.product.title.clone(),
            quantity: line.quantity,
            price: line.product.price.to_string(),
        }
    }
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub placed_at: String,
    pub lines: Vec<OrderLineView>,
    pub total: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            placed_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            lines: order.lines.iter().map(OrderLineView::from).collect(),
            total: order.total().to_string(),
        }
    }
}

/// Checkout summary template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/checkout.html")]
pub struct CheckoutTemplate {
    pub meta: PageMeta,
    pub lines: Vec<CartLineView>,
    pub total: String,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/orders.html")]
pub struct OrdersTemplate {
    pub meta: PageMeta,
    pub orders: Vec<OrderView>,
}

/// Display the checkout summary.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<CheckoutTemplate> {
    let cart = state.carts().cart_view(&user).await?;
    let (lines, total) = line_views(&cart);

    Ok(CheckoutTemplate {
        meta: PageMeta::authenticated("Checkout", "/checkout"),
        lines,
        total,
    })
}

/// Place an order from the cart, then show the order history.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    let order_id = state.orders().place_order(&user).await?;

    add_breadcrumb("order", "Order placed", &[("order_id", order_id.to_string())]);

    Ok(Redirect::to("/orders"))
}

/// Display the user's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<OrdersTemplate> {
    let orders = state.orders().list_orders(&user).await?;

    Ok(OrdersTemplate {
        meta: PageMeta::authenticated("Your Orders", "/orders"),
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

/// Serve the invoice PDF of one of the user's orders.
///
/// The stored copy is written in the background from the same bytes.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("order {id}")))?;

    let IssuedInvoice { invoice, .. } = state.invoices().issue(order_id, &user).await?;

    let disposition = format!("inline; filename=\"{}\"", invoice.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        invoice.bytes,
    )
        .into_response())
}
