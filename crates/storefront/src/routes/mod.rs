//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Product listing
//! GET  /api/products           - Product listing
//!
//! # Account
//! GET  /profile                - Signed-in customer and order history
//! GET  /api/orders             - Order history only
//!
//! Anything else                - JSON 404
//! ```
//!
//! `/health` and `/health/ready` are mounted by [`crate::app`].

pub mod account;
pub mod home;

use axum::{Router, http::Uri, routing::get};

use crate::error::AppError;
use crate::state::AppState;

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::products))
        .route("/api/products", get(home::products))
        .route("/profile", get(account::profile))
        .route("/api/orders", get(account::orders))
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
