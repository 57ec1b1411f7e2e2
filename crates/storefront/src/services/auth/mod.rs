//! Authentication service.
//!
//! Password registration and login, and single-use password reset tokens.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::instrument;

use blossom_core::{Email, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::user::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a password reset link stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// A password reset that should be emailed to the user.
///
/// Carries the only copy of the raw token; the database keeps its digest.
#[derive(Debug, Clone)]
pub struct PasswordResetNotice {
    pub email: Email,
    pub name: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
pub struct AuthService<'a, S: ?Sized> {
    users: &'a S,
}

impl<'a, S: UserStore + ?Sized> AuthService<'a, S> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a S) -> Self {
        Self { users }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user. Their cart and wishlist are created with them.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, name, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .register_user(&NewUser {
                name: name.to_owned(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .user_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset token for the account with this email.
    ///
    /// Returns `None` for an unknown email; callers must answer the client the
    /// same way in both cases. The token digest is stored before returning, so
    /// it is valid whether or not the email is delivered.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    #[instrument(skip(self))]
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<PasswordResetNotice>, AuthError> {
        let email = Email::parse(email)?;
        let Some(user) = self.users.user_by_email(&email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.users
            .store_reset_token(user.id, &digest_token(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(Some(PasswordResetNotice {
            email: user.email,
            name: user.name,
            token,
            expires_at,
        }))
    }

    /// Set a new password using a reset token. The token is consumed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown, used or expired.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<UserId, AuthError> {
        validate_password(password)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidResetToken);
        }
        let password_hash = hash_password(password)?;

        let user_id = self
            .users
            .reset_password(&digest_token(token), Utc::now(), &password_hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        tracing::info!(user_id = %user_id, "Password reset");
        Ok(user_id)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// 32 random bytes, hex encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of the token, hex encoded. Only this is stored.
fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth
            .register(" Violet ", "Violet@Blossom.test", "correct horse")
            .await
            .unwrap();
        assert_eq!(user.name, "Violet");
        assert_eq!(user.email.as_str(), "violet@blossom.test");

        let logged_in = auth.login("violet@blossom.test", "correct horse").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("violet@blossom.test", "wrong horse").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@blossom.test", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration_creates_nothing() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        auth.register("Violet", "violet@blossom.test", "correct horse")
            .await
            .unwrap();
        let before = store.row_counts();

        let err = auth
            .register("Other", "VIOLET@blossom.test", "another pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
        assert_eq!(store.row_counts(), before);
        assert_eq!(before, (1, 1, 1));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        assert!(matches!(
            auth.register("", "a@b.c", "long enough").await,
            Err(AuthError::MissingName)
        ));
        assert!(matches!(
            auth.register("A", "not-an-email", "long enough").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("A", "a@b.c", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert_eq!(store.row_counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth
            .register("Violet", "violet@blossom.test", "old password")
            .await
            .unwrap();

        let notice = auth
            .request_password_reset("violet@blossom.test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice.token.len(), 64);
        assert!(notice.expires_at > Utc::now());
        let old_hash = store.password_hash_of(user.id).unwrap();

        let reset_id = auth
            .reset_password(&notice.token, "new password")
            .await
            .unwrap();
        assert_eq!(reset_id, user.id);
        let new_hash = store.password_hash_of(user.id).unwrap();
        assert_ne!(new_hash, old_hash);
        assert!(new_hash.starts_with("$argon2id$"));
        assert!(auth.login("violet@blossom.test", "new password").await.is_ok());
        assert!(auth.login("violet@blossom.test", "old password").await.is_err());

        assert!(matches!(
            auth.reset_password(&notice.token, "third password").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_reset_for_unknown_email_is_silent() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        assert!(auth
            .request_password_reset("ghost@blossom.test")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth
            .register("Violet", "violet@blossom.test", "old password")
            .await
            .unwrap();

        let token = generate_reset_token();
        store
            .store_reset_token(user.id, &digest_token(&token), Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        assert!(matches!(
            auth.reset_password(&token, "new password").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[test]
    fn test_token_digest_is_stable_hex() {
        let digest = digest_token("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(generate_reset_token(), generate_reset_token());
    }
}
