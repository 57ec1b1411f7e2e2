//! Cart route handlers.
//!
//! Guests keep their cart in the session as an [`AnonymousCart`]; signed-in
//! users work on their persisted cart through [`CartService`]. Both answer
//! with the same [`CartView`] shape and both keep one line per product.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use blossom_core::{CartId, Price, ProductId, Quantity};

use crate::db::{ProductStore, RepositoryError};
use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::session::{anonymous_cart, save_anonymous_cart};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{AnonymousCart, Cart, ProductSummary};
use crate::routes::ApiResponse;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Cart as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Absent for a guest cart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CartId>,
    pub items: Vec<CartItemView>,
    pub total_quantity: i64,
    pub subtotal: Price,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub product: ProductSummary,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let total_quantity = cart.total_quantity();
        let subtotal = cart.subtotal();
        Self {
            id: Some(cart.id),
            items: cart
                .items
                .into_iter()
                .map(|line| CartItemView {
                    product_id: line.product.id,
                    quantity: line.quantity,
                    product: line.product,
                })
                .collect(),
            total_quantity,
            subtotal,
        }
    }
}

impl CartView {
    /// Resolve a guest cart against the catalog. Lines for products that no
    /// longer exist are left out.
    async fn for_guest<S>(store: &S, cart: &AnonymousCart) -> Result<Self, RepositoryError>
    where
        S: ProductStore + ?Sized,
    {
        let mut items = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            if let Some(product) = store.product(line.product_id).await? {
                items.push(CartItemView {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    product: product.summary(),
                });
            }
        }

        Ok(Self {
            id: None,
            total_quantity: items.iter().map(|i| i64::from(i.quantity.get())).sum(),
            subtotal: items
                .iter()
                .map(|i| i.product.sale_price().times(i.quantity.get()))
                .sum(),
            items,
        })
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    /// Defaults to 1. Must be at least 1.
    #[serde(default)]
    pub quantity: Option<Quantity>,
}

/// Quantity update body. Zero or below removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// Client-held cart lines to fold into the user's cart.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub items: Vec<MergeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Show the current cart.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<ApiResponse<CartView>, AppError> {
    let view: CartView = match user {
        Some(user) => CartService::new(state.store()).cart(user.id).await?.into(),
        None => CartView::for_guest(state.store(), &anonymous_cart(&session).await?).await?,
    };
    Ok(ApiResponse::new("Cart retrieved", view))
}

/// Add units of a product.
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<ApiResponse<CartView>, AppError> {
    let quantity = body.quantity.unwrap_or(Quantity::ONE);

    let view: CartView = if let Some(user) = user {
        CartService::new(state.store())
            .add_item(user.id, body.product_id, quantity)
            .await?
            .into()
    } else {
        if state.store().product(body.product_id).await?.is_none() {
            return Err(AppError::NotFound("Product not found".to_owned()));
        }
        let mut cart = anonymous_cart(&session).await?;
        cart.add(body.product_id, quantity);
        save_anonymous_cart(&session, &cart).await?;
        CartView::for_guest(state.store(), &cart).await?
    };

    Ok(ApiResponse::new("Item added to cart", view))
}

/// Set the quantity of a line.
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> Result<ApiResponse<CartView>, AppError> {
    let view: CartView = if let Some(user) = user {
        CartService::new(state.store())
            .update_quantity(user.id, product_id, body.quantity)
            .await?
            .into()
    } else {
        let mut cart = anonymous_cart(&session).await?;
        if !cart.set_quantity(product_id, body.quantity) {
            return Err(AppError::NotFound("Item not in cart".to_owned()));
        }
        save_anonymous_cart(&session, &cart).await?;
        CartView::for_guest(state.store(), &cart).await?
    };

    Ok(ApiResponse::new("Cart updated", view))
}

/// Remove a line.
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<ApiResponse<CartView>, AppError> {
    let view: CartView = if let Some(user) = user {
        CartService::new(state.store())
            .remove_item(user.id, product_id)
            .await?
            .into()
    } else {
        let mut cart = anonymous_cart(&session).await?;
        if !cart.remove(product_id) {
            return Err(AppError::NotFound("Item not in cart".to_owned()));
        }
        save_anonymous_cart(&session, &cart).await?;
        CartView::for_guest(state.store(), &cart).await?
    };

    Ok(ApiResponse::new("Item removed from cart", view))
}

/// Merge a client-held cart into the signed-in user's cart.
///
/// Entries for the same product are summed first. Non-positive quantities and
/// unknown products are skipped.
pub async fn merge(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<MergeRequest>,
) -> Result<ApiResponse<CartView>, AppError> {
    let anonymous = AnonymousCart::from_pairs(
        body.items
            .into_iter()
            .map(|item| (item.product_id, item.quantity)),
    );
    let cart = CartService::new(state.store())
        .merge_carts(&anonymous, user.id)
        .await?;
    Ok(ApiResponse::new("Carts merged", cart.into()))
}
