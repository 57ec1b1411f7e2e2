//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness
//! GET    /health/ready                   - Readiness (database ping)
//!
//! # Auth (rate limited in the binary)
//! POST   /api/auth/register              - Create an account
//! POST   /api/auth/login                 - Sign in, merging the session cart
//! POST   /api/auth/logout                - Sign out
//! POST   /api/auth/forgot-password       - Email a reset link (always 200)
//! POST   /api/auth/reset-password        - Consume a reset token
//!
//! # Catalog
//! GET    /api/products                   - Product listing
//! GET    /api/products/{id}              - Product detail
//!
//! # Cart (guest: session; signed in: persisted)
//! GET    /api/cart                       - Current cart
//! POST   /api/cart/items                 - Add a product
//! PUT    /api/cart/items/{productId}     - Set a line's quantity (<= 0 removes)
//! DELETE /api/cart/items/{productId}     - Remove a line
//! POST   /api/cart/merge                 - Merge client-held items (requires auth)
//!
//! # Wishlist (requires auth)
//! GET    /api/wishlist                   - Wishlist
//! POST   /api/wishlist/items             - Add a product
//! DELETE /api/wishlist/items/{productId} - Remove a product
//!
//! # Account (requires auth)
//! GET    /api/user/addresses             - Address list, default first
//! POST   /api/user/addresses             - Create an address
//! PUT    /api/user/addresses/{id}        - Replace an address
//! DELETE /api/user/addresses/{id}        - Delete an address
//! PUT    /api/user/addresses/{id}/default - Make an address the default
//! GET    /api/user/orders                - Order history
//! GET    /api/user/orders/{id}           - Order detail
//! PUT    /api/user/profile               - Change name and/or email
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod products;
pub mod wishlist;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Serialize;

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Envelope for every successful response.
///
/// `data` is omitted from the JSON when there is nothing to return.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A response carrying `data`.
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A response with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            put(cart::update).delete(cart::remove),
        )
        .route("/merge", post(cart::merge))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/items", post(wishlist::add))
        .route("/items/{product_id}", delete(wishlist::remove))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            put(account::update_address).delete(account::delete_address),
        )
        .route("/addresses/{id}/default", put(account::set_default_address))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/profile", put(account::update_profile))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Create all API routes for the storefront.
///
/// `auth_limiter` is applied to `/api/auth` only.
pub fn routes(auth_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let auth = match auth_limiter {
        Some(limiter) => auth_routes().layer(limiter),
        None => auth_routes(),
    };

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth)
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/wishlist", wishlist_routes())
        .nest("/api/user", account_routes())
}
