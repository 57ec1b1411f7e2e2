//! Wishlist route handlers. Every route requires a signed-in user.

use axum::extract::State;
use serde::Deserialize;

use blossom_core::ProductId;

use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::RequireAuth;
use crate::models::Wishlist;
use crate::routes::ApiResponse;
use crate::services::wishlist::WishlistService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlistRequest {
    pub product_id: ProductId,
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Wishlist>, AppError> {
    let wishlist = WishlistService::new(state.store()).list(user.id).await?;
    Ok(ApiResponse::new("Wishlist retrieved", wishlist))
}

pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddToWishlistRequest>,
) -> Result<ApiResponse<Wishlist>, AppError> {
    let wishlist = WishlistService::new(state.store())
        .add(user.id, body.product_id)
        .await?;
    Ok(ApiResponse::new("Added to wishlist", wishlist))
}

/// Removing a product that is not on the wishlist still succeeds.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<ApiResponse<Wishlist>, AppError> {
    let wishlist = WishlistService::new(state.store())
        .remove(user.id, product_id)
        .await?;
    Ok(ApiResponse::new("Removed from wishlist", wishlist))
}
