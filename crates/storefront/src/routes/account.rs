//! Account route handlers: addresses, order history and profile.
//!
//! Every route requires a signed-in user and only ever touches that user's
//! rows. Another user's address or order is indistinguishable from a missing one.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use blossom_core::{AddressId, OrderId};

use crate::db::RepositoryError;
use crate::error::{ApiJson, ApiPath, AppError, set_sentry_user};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{Address, AddressFields, CurrentUser, Order, User};
use crate::routes::ApiResponse;
use crate::services::address::AddressService;
use crate::services::orders::OrderService;
use crate::services::profile::ProfileService;
use crate::state::AppState;

// =============================================================================
// Addresses
// =============================================================================

/// Address create/replace body. Every field but `isDefault` is required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressRequest {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_default: bool,
}

impl AddressRequest {
    fn fields(&self) -> Result<AddressFields, AppError> {
        AddressFields::parse(
            self.street.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.postal_code.as_deref(),
            self.country.as_deref(),
        )
        .map_err(|e| AppError::Address(e.into()))
    }
}

/// List addresses, default first.
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<Address>>, AppError> {
    let addresses = AddressService::new(state.store()).list(user.id).await?;
    Ok(ApiResponse::new("Addresses retrieved", addresses))
}

pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddressRequest>,
) -> Result<(StatusCode, ApiResponse<Address>), AppError> {
    let fields = body.fields()?;
    let address = AddressService::new(state.store())
        .upsert(user.id, None, &fields, body.is_default)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::new("Address created successfully", address),
    ))
}

pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
    ApiJson(body): ApiJson<AddressRequest>,
) -> Result<ApiResponse<Address>, AppError> {
    let fields = body.fields()?;
    let address = AddressService::new(state.store())
        .upsert(user.id, Some(id), &fields, body.is_default)
        .await?;
    Ok(ApiResponse::new("Address updated successfully", address))
}

pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
) -> Result<ApiResponse<()>, AppError> {
    AddressService::new(state.store()).delete(user.id, id).await?;
    Ok(ApiResponse::message("Address deleted successfully"))
}

pub async fn set_default_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
) -> Result<ApiResponse<Address>, AppError> {
    let address = AddressService::new(state.store())
        .set_default(user.id, id)
        .await?;
    Ok(ApiResponse::new("Default address updated", address))
}

// =============================================================================
// Orders
// =============================================================================

/// Order history, newest first.
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<Order>>, AppError> {
    let orders = OrderService::new(state.store()).list(user.id).await?;
    Ok(ApiResponse::new("Orders retrieved", orders))
}

pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiResponse<Order>, AppError> {
    let order = OrderService::new(state.store())
        .get(user.id, id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Order not found".to_owned()),
            other => other.into(),
        })?;
    Ok(ApiResponse::new("Order retrieved", order))
}

// =============================================================================
// Profile
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Change name and/or email. The session identity is refreshed to match.
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    ApiJson(body): ApiJson<ProfileRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let updated = ProfileService::new(state.store())
        .update(user.id, body.name.as_deref(), body.email.as_deref())
        .await?;

    set_current_user(
        &session,
        &CurrentUser {
            id: updated.id,
            email: updated.email.clone(),
            name: updated.name.clone(),
        },
    )
    .await?;
    set_sentry_user(&updated.id, Some(updated.email.as_str()));

    Ok(ApiResponse::new("Profile updated successfully", updated))
}
