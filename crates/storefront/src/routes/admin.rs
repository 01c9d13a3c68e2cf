//! Product administration handlers.
//!
//! Signed-in users manage the products they created. Add and edit forms are
//! `multipart/form-data` because they carry the product image.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Product;
use crate::routes::PageMeta;
use crate::routes::shop::ProductView;
use crate::services::{CatalogError, ImageUpload, ProductInput, UploadError};
use crate::state::AppState;

/// Add/edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_product.html")]
pub struct EditProductTemplate {
    pub meta: PageMeta,
    /// Set when editing an existing product.
    pub product_id: Option<ProductId>,
    pub input: ProductInput,
    pub errors: Vec<String>,
}

impl EditProductTemplate {
    fn add(input: ProductInput, errors: Vec<String>) -> Self {
        Self {
            meta: PageMeta::authenticated("Add Product", "/admin/add-product"),
            product_id: None,
            input,
            errors,
        }
    }

    fn edit(id: ProductId, input: ProductInput, errors: Vec<String>) -> Self {
        Self {
            meta: PageMeta::authenticated("Edit Product", "/admin/edit-product"),
            product_id: Some(id),
            input,
            errors,
        }
    }
}

/// The user's products template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub meta: PageMeta,
    pub products: Vec<ProductView>,
}

/// Fields of a submitted product form.
#[derive(Debug, Default)]
pub struct ProductSubmission {
    pub product_id: Option<String>,
    pub input: ProductInput,
    pub image: Option<ImageUpload>,
}

impl ProductSubmission {
    /// Read every field of the form. An empty file field counts as no image.
    async fn read(mut multipart: Multipart) -> std::result::Result<Self, MultipartError> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let content_type = field.content_type().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await?;
                    if !file_name.is_empty() && !bytes.is_empty() {
                        submission.image = Some(ImageUpload {
                            content_type,
                            file_name,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                "title" => submission.input.title = field.text().await?,
                "price" => submission.input.price = field.text().await?,
                "description" => submission.input.description = field.text().await?,
                "product_id" => submission.product_id = Some(field.text().await?),
                _ => {
                    tracing::debug!(field = %name, "Ignoring unknown form field");
                }
            }
        }

        Ok(submission)
    }
}

fn bad_form(e: &MultipartError) -> AppError {
    AppError::BadRequest(format!("Could not read the form: {e}"))
}

/// Messages for catalog errors the user can fix; anything else is a server error.
fn form_errors(err: CatalogError) -> Result<Vec<String>> {
    match err {
        CatalogError::Invalid(errors) => Ok(errors),
        CatalogError::MissingImage
        | CatalogError::Upload(UploadError::UnsupportedType(_) | UploadError::MissingFileName) => {
            Ok(vec!["Attached file is not an image.".to_owned()])
        }
        other => Err(other.into()),
    }
}

fn input_from(product: &Product) -> ProductInput {
    ProductInput {
        title: product.title.clone(),
        price: product.price.to_plain_string(),
        description: product.description.clone(),
    }
}

// =============================================================================
// Add
// =============================================================================

/// Display the add product form.
pub async fn add_product_page(RequireAuth(_user): RequireAuth) -> EditProductTemplate {
    EditProductTemplate::add(ProductInput::default(), Vec::new())
}

/// Create a product from the submitted form.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let submission = ProductSubmission::read(multipart)
        .await
        .map_err(|e| bad_form(&e))?;

    match state
        .catalog()
        .add_product(&user, &submission.input, submission.image.as_ref())
        .await
    {
        Ok(product) => {
            add_breadcrumb("admin", "Product added", &[("product_id", product.id.to_string())]);
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(e) => {
            let errors = form_errors(e)?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                EditProductTemplate::add(submission.input, errors),
            )
                .into_response())
        }
    }
}

// =============================================================================
// List
// =============================================================================

/// Display the user's own products.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn products(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<AdminProductsTemplate> {
    let products = state.catalog().owned_products(&user).await?;

    Ok(AdminProductsTemplate {
        meta: PageMeta::authenticated("Admin Products", "/admin/products"),
        products: products.iter().map(ProductView::from).collect(),
    })
}

// =============================================================================
// Edit
// =============================================================================

/// Display the edit form for one of the user's products.
///
/// Unknown or foreign products redirect to the shop.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn edit_product_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let Ok(id) = id.parse::<ProductId>() else {
        return Ok(Redirect::to("/").into_response());
    };

    match state.catalog().owned_product(id, &user).await {
        Ok(product) => {
            Ok(EditProductTemplate::edit(id, input_from(&product), Vec::new()).into_response())
        }
        Err(CatalogError::NotFound(_)) => Ok(Redirect::to("/").into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Update a product from the submitted form.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let submission = ProductSubmission::read(multipart)
        .await
        .map_err(|e| bad_form(&e))?;

    let Some(id) = submission
        .product_id
        .as_deref()
        .and_then(|id| id.parse::<ProductId>().ok())
    else {
        return Ok(Redirect::to("/").into_response());
    };

    match state
        .catalog()
        .update_product(id, &user, &submission.input, submission.image.as_ref())
        .await
    {
        Ok(_) => {
            add_breadcrumb("admin", "Product updated", &[("product_id", id.to_string())]);
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(CatalogError::NotFound(_)) => Ok(Redirect::to("/").into_response()),
        Err(e) => {
            let errors = form_errors(e)?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                EditProductTemplate::edit(id, submission.input, errors),
            )
                .into_response())
        }
    }
}

// =============================================================================
// Delete
// =============================================================================

/// Delete one of the user's products. Replies with JSON for the page script.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let result = match id.parse::<ProductId>() {
        Ok(id) => state.catalog().delete_product(id, &user).await,
        Err(_) => {
            tracing::info!(product_id = %id, "Delete with malformed product id");
            return failed_delete();
        }
    };

    match result {
        Ok(()) => Json(json!({ "message": "Success!" })).into_response(),
        Err(e) => {
            tracing::warn!(product_id = %id, error = %e, "Deleting product failed");
            failed_delete()
        }
    }
}

fn failed_delete() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Deleting product failed." })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_shown() {
        let errors = form_errors(CatalogError::Invalid(vec!["Title too short".to_owned()]));
        assert_eq!(errors.ok(), Some(vec!["Title too short".to_owned()]));
    }

    #[test]
    fn test_rejected_image_is_shown() {
        let errors = form_errors(CatalogError::Upload(UploadError::UnsupportedType(
            "image/gif".to_owned(),
        )));
        assert_eq!(errors.ok(), Some(vec!["Attached file is not an image.".to_owned()]));
    }

    #[test]
    fn test_store_failure_is_server_error() {
        let err = form_errors(CatalogError::Repository(
            crate::db::RepositoryError::NotFound,
        ));
        assert!(err.is_err());
    }
}
