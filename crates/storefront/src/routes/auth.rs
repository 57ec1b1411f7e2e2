//! Authentication route handlers.
//!
//! Registration, password login and logout, and the password reset flow.
//! A successful login folds the session's guest cart into the user's cart.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{ApiJson, AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::session::{anonymous_cart, clear_anonymous_cart};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::ApiResponse;
use crate::services::auth::AuthService;
use crate::services::cart::{CartError, CartService};
use crate::services::email::{OutgoingEmail, send_in_background};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Create an account. The user is not signed in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ApiResponse<User>), AppError> {
    let user = AuthService::new(state.store())
        .register(&body.name, &body.email, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new("User created successfully", user),
    ))
}

/// Sign in with email and password.
///
/// The session ID is rotated, then any guest cart held in the session is
/// merged into the persisted cart and cleared. A merge that could not start
/// keeps the guest cart for the next login; the sign-in itself still succeeds.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let user = AuthService::new(state.store())
        .login(&body.email, &body.password)
        .await?;

    session.cycle_id().await?;
    set_current_user(
        &session,
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        },
    )
    .await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let guest = anonymous_cart(&session).await?;
    if !guest.is_empty() {
        match CartService::new(state.store())
            .merge_carts(&guest, user.id)
            .await
        {
            Ok(_) => clear_anonymous_cart(&session).await?,
            Err(CartError::CartUnavailable(e)) => {
                tracing::warn!(error = %e, user_id = %user.id, "Cart unavailable; guest cart kept for next login");
            }
            Err(e) => {
                // Earlier lines may already be applied; merging again would double them.
                tracing::error!(error = %e, user_id = %user.id, "Guest cart merge failed part-way");
                clear_anonymous_cart(&session).await?;
            }
        }
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(ApiResponse::new("Logged in", user))
}

/// Sign out and discard the session, guest cart included.
pub async fn logout(session: Session) -> Result<ApiResponse<()>, AppError> {
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(ApiResponse::message("Logged out"))
}

/// Email a password reset link.
///
/// Answers the same way whether or not the email belongs to an account. The
/// email is sent in the background; delivery failures are only logged.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> Result<ApiResponse<()>, AppError> {
    let notice = AuthService::new(state.store())
        .request_password_reset(&body.email)
        .await?;

    if let Some(notice) = notice {
        let reset_url = state.config().password_reset_url(&notice.token);
        match OutgoingEmail::password_reset(&notice, &reset_url) {
            Ok(email) => send_in_background(state.mailer(), email),
            Err(e) => tracing::error!(error = %e, "Failed to render password reset email"),
        }
    }

    Ok(ApiResponse::message(
        "If an account exists for that email, a reset link has been sent",
    ))
}

/// Set a new password with a reset token.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, AppError> {
    AuthService::new(state.store())
        .reset_password(&body.token, &body.password)
        .await?;
    Ok(ApiResponse::message("Password updated"))
}
