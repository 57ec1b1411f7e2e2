//! Catalog route handlers.

use axum::extract::State;

use blossom_core::ProductId;

use crate::db::ProductStore;
use crate::error::{ApiPath, AppError};
use crate::models::Product;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// List every product, newest first.
pub async fn index(State(state): State<AppState>) -> Result<ApiResponse<Vec<Product>>, AppError> {
    let products = state.store().products().await?;
    Ok(ApiResponse::new("Products retrieved", products))
}

/// Show one product.
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = state
        .store()
        .product(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;
    Ok(ApiResponse::new("Product retrieved", product))
}
