//! Error pages reachable by URL.

use axum::{http::StatusCode, response::Response};

use crate::error::error_page;

/// Generic error page, the target of redirects after unexpected failures.
pub async fn server_error() -> Response {
    error_page(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong. We're working on fixing this, sorry for the inconvenience!",
    )
}

/// Fallback for unknown paths.
pub async fn not_found() -> Response {
    error_page(StatusCode::NOT_FOUND, "Page not found!")
}
