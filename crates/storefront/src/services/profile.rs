//! Profile updates for the signed-in user.

use thiserror::Error;
use tracing::instrument;

use blossom_core::{Email, EmailError, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::user::User;

/// Errors from profile updates.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Neither a name nor an email was supplied.
    #[error("nothing to update")]
    NothingToUpdate,

    /// The name was supplied but blank.
    #[error("name cannot be blank")]
    BlankName,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The email belongs to another account.
    #[error("email already in use")]
    EmailTaken,

    /// The user no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ProfileError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::EmailTaken,
            RepositoryError::NotFound => Self::UserNotFound,
            other => Self::Repository(other),
        }
    }
}

/// Profile operations.
pub struct ProfileService<'a, S: ?Sized> {
    users: &'a S,
}

impl<'a, S: UserStore + ?Sized> ProfileService<'a, S> {
    #[must_use]
    pub const fn new(users: &'a S) -> Self {
        Self { users }
    }

    /// Change the user's name and/or email.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NothingToUpdate` when both are `None`,
    /// `ProfileError::EmailTaken` when the email belongs to someone else.
    #[instrument(skip(self, name, email), fields(user_id = %user_id))]
    pub async fn update(
        &self,
        user_id: UserId,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, ProfileError> {
        if name.is_none() && email.is_none() {
            return Err(ProfileError::NothingToUpdate);
        }

        let name = name.map(str::trim);
        if name.is_some_and(str::is_empty) {
            return Err(ProfileError::BlankName);
        }
        let email = email.map(Email::parse).transpose()?;

        if let Some(email) = &email
            && let Some(existing) = self.users.user_by_email(email).await?
            && existing.id != user_id
        {
            return Err(ProfileError::EmailTaken);
        }

        // The unique index still catches a concurrent claim of the same email.
        Ok(self.users.update_profile(user_id, name, email.as_ref()).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::user::NewUser;

    async fn user(store: &MemoryStore, email: &str) -> UserId {
        store
            .register_user(&NewUser {
                name: "Fern".to_owned(),
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_owned(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_requires_some_field() {
        let store = MemoryStore::new();
        let id = user(&store, "fern@blossom.test").await;
        let profile = ProfileService::new(&store);

        assert!(matches!(
            profile.update(id, None, None).await,
            Err(ProfileError::NothingToUpdate)
        ));
        assert!(matches!(
            profile.update(id, Some("  "), None).await,
            Err(ProfileError::BlankName)
        ));
    }

    #[tokio::test]
    async fn test_updates_name_and_email() {
        let store = MemoryStore::new();
        let id = user(&store, "fern@blossom.test").await;
        let profile = ProfileService::new(&store);

        let updated = profile
            .update(id, Some("Fern Moss"), Some("Moss@Blossom.test"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Fern Moss");
        assert_eq!(updated.email.as_str(), "moss@blossom.test");

        // Re-submitting one's own email is not a conflict.
        assert!(profile.update(id, None, Some("moss@blossom.test")).await.is_ok());
    }

    #[tokio::test]
    async fn test_email_taken_by_other_user() {
        let store = MemoryStore::new();
        let id = user(&store, "fern@blossom.test").await;
        user(&store, "sage@blossom.test").await;
        let profile = ProfileService::new(&store);

        assert!(matches!(
            profile.update(id, None, Some("sage@blossom.test")).await,
            Err(ProfileError::EmailTaken)
        ));
    }
}
