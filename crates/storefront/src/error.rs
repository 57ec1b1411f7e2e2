//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server errors are captured to
//! Sentry before the response is built; clients always receive a JSON body of
//! the form `{ "message": "..." }` and never see internal details.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::address::AddressError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::profile::ProfileError;
use crate::services::wishlist::WishlistError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Body of every error response.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

const INTERNAL: &str = "Internal server error";

impl AppError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_response(err),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
                }
                AuthError::MissingName => (StatusCode::BAD_REQUEST, "Name is required".to_owned()),
                AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                AuthError::InvalidResetToken => (
                    StatusCode::BAD_REQUEST,
                    "Invalid or expired reset token".to_owned(),
                ),
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned())
                }
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    "An account with this email already exists".to_owned(),
                ),
                AuthError::Repository(err) => repository_response(err),
                AuthError::PasswordHash => internal(),
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound => {
                    (StatusCode::NOT_FOUND, "Product not found".to_owned())
                }
                CartError::LineNotFound => (StatusCode::NOT_FOUND, "Item not in cart".to_owned()),
                CartError::CartUnavailable(_) => internal(),
                CartError::Repository(err) => repository_response(err),
            },
            Self::Address(err) => match err {
                AddressError::Invalid(err) => (StatusCode::BAD_REQUEST, capitalize(&err.to_string())),
                AddressError::NotFound => (StatusCode::NOT_FOUND, "Address not found".to_owned()),
                AddressError::Conflict => (
                    StatusCode::CONFLICT,
                    "Default address changed concurrently, please retry".to_owned(),
                ),
                AddressError::Repository(err) => repository_response(err),
            },
            Self::Profile(err) => match err {
                ProfileError::NothingToUpdate => (
                    StatusCode::BAD_REQUEST,
                    "Provide a name or an email to update".to_owned(),
                ),
                ProfileError::BlankName => {
                    (StatusCode::BAD_REQUEST, "Name cannot be blank".to_owned())
                }
                ProfileError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
                }
                ProfileError::EmailTaken => {
                    (StatusCode::CONFLICT, "Email is already in use".to_owned())
                }
                ProfileError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_owned()),
                ProfileError::Repository(err) => repository_response(err),
            },
            Self::Wishlist(err) => match err {
                WishlistError::ProductNotFound => {
                    (StatusCode::NOT_FOUND, "Product not found".to_owned())
                }
                WishlistError::Repository(err) => repository_response(err),
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(_) => internal(),
        }
    }
}

fn internal() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
}

fn repository_response(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
        RepositoryError::Conflict(what) => (StatusCode::CONFLICT, capitalize(what)),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

/// JSON body extractor whose rejections use the `{ "message": ... }` shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the `{ "message": ... }` shape.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
