//! Catalog listing.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::catalog::Product;
use crate::error::Result;
use crate::state::AppState;

/// Product listing response.
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

/// List every catalog product.
pub async fn products(State(state): State<AppState>) -> Result<Json<ProductsResponse>> {
    let products = state.catalog().list_products().await?;
    Ok(Json(ProductsResponse {
        products: products.as_ref().clone(),
    }))
}
