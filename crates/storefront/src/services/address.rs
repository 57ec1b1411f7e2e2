//! Address service.
//!
//! Keeps at most one default address per user. Making an address the default
//! clears the flag on the user's other addresses first, then sets it on the
//! target: two statements, not a transaction. The partial unique index
//! `address_one_default_per_user` turns a racing second writer into
//! `AddressError::Conflict` instead of a second default.

use thiserror::Error;
use tracing::instrument;

use blossom_core::{AddressId, UserId};

use crate::db::{AddressStore, RepositoryError};
use crate::models::address::{Address, AddressFields, AddressFieldsError};

/// Errors from address operations.
#[derive(Debug, Error)]
pub enum AddressError {
    /// Required fields missing or blank.
    #[error(transparent)]
    Invalid(#[from] AddressFieldsError),

    /// The address does not exist or belongs to another user.
    #[error("address not found")]
    NotFound,

    /// A concurrent request changed the default address.
    #[error("default address changed concurrently")]
    Conflict,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AddressError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::Conflict,
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Address operations for a signed-in user.
pub struct AddressService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: AddressStore + ?Sized> AddressService<'a, S> {
    /// Create an address service over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Repository` if the database operation fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, AddressError> {
        Ok(self.store.addresses_for_user(user_id).await?)
    }

    /// Create (`address_id = None`) or replace one of the user's addresses.
    ///
    /// With `is_default` the user's current default is cleared before the
    /// write, unless the target already is that default. With `is_default = false` no other address is touched; updating
    /// the current default this way leaves the user without one.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::NotFound` if `address_id` is not one of the
    /// user's addresses and `AddressError::Conflict` if a concurrent request
    /// set another default in between.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn upsert(
        &self,
        user_id: UserId,
        address_id: Option<AddressId>,
        input: &AddressFields,
        is_default: bool,
    ) -> Result<Address, AddressError> {
        let was_default = match address_id {
            Some(id) => {
                self.store
                    .address(user_id, id)
                    .await?
                    .ok_or(AddressError::NotFound)?
                    .is_default
            }
            None => false,
        };

        if is_default && !was_default {
            self.store.clear_default(user_id).await?;
        }

        match address_id {
            Some(id) => self
                .store
                .update_address(user_id, id, input, is_default)
                .await?
                .ok_or(AddressError::NotFound),
            None => Ok(self.store.insert_address(user_id, input, is_default).await?),
        }
    }

    /// Make one of the user's addresses the default.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::NotFound` for a missing or foreign address
    /// (nothing is modified) and `AddressError::Conflict` if a concurrent
    /// request set another default in between.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn set_default(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Address, AddressError> {
        if self.store.address(user_id, address_id).await?.is_none() {
            return Err(AddressError::NotFound);
        }

        self.store.clear_default(user_id).await?;
        self.store
            .mark_default(user_id, address_id)
            .await?
            .ok_or(AddressError::NotFound)
    }

    /// Delete one of the user's addresses. Deleting the default does not
    /// promote another address.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::NotFound` for a missing or foreign address.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn delete(&self, user_id: UserId, address_id: AddressId) -> Result<(), AddressError> {
        if self.store.delete_address(user_id, address_id).await? {
            Ok(())
        } else {
            Err(AddressError::NotFound)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::user::NewUser;

    async fn user(store: &MemoryStore, email: &str) -> UserId {
        store
            .register_user(&NewUser {
                name: "Rosa".to_owned(),
                email: blossom_core::Email::parse(email).unwrap(),
                password_hash: "hash".to_owned(),
            })
            .await
            .unwrap()
            .id
    }

    fn fields(street: &str) -> AddressFields {
        AddressFields::parse(
            Some(street),
            Some("Portland"),
            Some("OR"),
            Some("97201"),
            Some("US"),
        )
        .unwrap()
    }

    async fn defaults(store: &MemoryStore, user_id: UserId) -> Vec<AddressId> {
        store
            .addresses_for_user(user_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.is_default)
            .map(|a| a.id)
            .collect()
    }

    #[tokio::test]
    async fn test_set_default_transfers_flag() {
        let store = MemoryStore::new();
        let user_id = user(&store, "rosa@blossom.test").await;
        let service = AddressService::new(&store);

        let a = service.upsert(user_id, None, &fields("1 Elm"), true).await.unwrap();
        let b = service.upsert(user_id, None, &fields("2 Oak"), false).await.unwrap();

        let b = service.set_default(user_id, b.id).await.unwrap();
        assert!(b.is_default);
        assert!(!store.address(user_id, a.id).await.unwrap().unwrap().is_default);
        assert_eq!(defaults(&store, user_id).await, vec![b.id]);

        service.set_default(user_id, a.id).await.unwrap();
        service.set_default(user_id, b.id).await.unwrap();
        assert_eq!(defaults(&store, user_id).await, vec![b.id]);
    }

    #[tokio::test]
    async fn test_upsert_default_replaces_existing_default() {
        let store = MemoryStore::new();
        let user_id = user(&store, "rosa@blossom.test").await;
        let service = AddressService::new(&store);

        service.upsert(user_id, None, &fields("1 Elm"), true).await.unwrap();
        let c = service.upsert(user_id, None, &fields("3 Ash"), true).await.unwrap();

        assert_eq!(defaults(&store, user_id).await, vec![c.id]);

        let listed = service.list(user_id).await.unwrap();
        assert_eq!(listed.first().map(|a| a.id), Some(c.id));
    }

    #[tokio::test]
    async fn test_resaving_default_keeps_it_default() {
        let store = MemoryStore::new();
        let user_id = user(&store, "rosa@blossom.test").await;
        let service = AddressService::new(&store);

        let a = service.upsert(user_id, None, &fields("1 Elm"), true).await.unwrap();
        service.upsert(user_id, None, &fields("2 Oak"), false).await.unwrap();

        let saved = service
            .upsert(user_id, Some(a.id), &fields("1 Elm Unit 2"), true)
            .await
            .unwrap();
        assert!(saved.is_default);
        assert_eq!(saved.street, "1 Elm Unit 2");
        assert_eq!(defaults(&store, user_id).await, vec![a.id]);
    }

    #[tokio::test]
    async fn test_non_default_upsert_leaves_other_flags() {
        let store = MemoryStore::new();
        let user_id = user(&store, "rosa@blossom.test").await;
        let service = AddressService::new(&store);

        let a = service.upsert(user_id, None, &fields("1 Elm"), true).await.unwrap();
        let b = service.upsert(user_id, None, &fields("2 Oak"), false).await.unwrap();
        service
            .upsert(user_id, Some(b.id), &fields("2 Oak Apt 4"), false)
            .await
            .unwrap();

        assert_eq!(defaults(&store, user_id).await, vec![a.id]);
    }

    #[tokio::test]
    async fn test_delete_default_leaves_none() {
        let store = MemoryStore::new();
        let user_id = user(&store, "rosa@blossom.test").await;
        let service = AddressService::new(&store);

        let a = service.upsert(user_id, None, &fields("1 Elm"), true).await.unwrap();
        service.upsert(user_id, None, &fields("2 Oak"), false).await.unwrap();

        service.delete(user_id, a.id).await.unwrap();
        assert!(defaults(&store, user_id).await.is_empty());
        assert_eq!(service.list(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_address_is_not_found_and_untouched() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@blossom.test").await;
        let other = user(&store, "other@blossom.test").await;
        let service = AddressService::new(&store);

        let a = service.upsert(owner, None, &fields("1 Elm"), false).await.unwrap();

        assert!(matches!(service.set_default(other, a.id).await, Err(AddressError::NotFound)));
        assert!(matches!(
            service.upsert(other, Some(a.id), &fields("hijack"), true).await,
            Err(AddressError::NotFound)
        ));
        assert!(matches!(service.delete(other, a.id).await, Err(AddressError::NotFound)));

        let stored = store.address(owner, a.id).await.unwrap().unwrap();
        assert_eq!(stored.street, "1 Elm");
        assert!(!stored.is_default);
    }

    #[tokio::test]
    async fn test_at_most_one_default_over_mixed_sequence() {
        let store = MemoryStore::new();
        let user_id = user(&store, "rosa@blossom.test").await;
        let service = AddressService::new(&store);

        let mut ids = Vec::new();
        for (i, street) in ["1 Elm", "2 Oak", "3 Ash", "4 Fir"].into_iter().enumerate() {
            let address = service
                .upsert(user_id, None, &fields(street), i % 2 == 0)
                .await
                .unwrap();
            ids.push(address.id);
            assert!(defaults(&store, user_id).await.len() <= 1);
        }

        service.set_default(user_id, ids[3]).await.unwrap();
        assert!(defaults(&store, user_id).await.len() <= 1);
        service.upsert(user_id, Some(ids[1]), &fields("2 Oak"), true).await.unwrap();
        assert_eq!(defaults(&store, user_id).await, vec![ids[1]]);
        service.delete(user_id, ids[1]).await.unwrap();
        assert!(defaults(&store, user_id).await.is_empty());
        service.upsert(user_id, Some(ids[0]), &fields("1 Elm"), false).await.unwrap();
        assert!(defaults(&store, user_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_racing_default_reports_conflict() {
        let store = MemoryStore::new();
        let user_id = user(&store, "rosa@blossom.test").await;

        // Another request set a default between our clear and our write.
        store.insert_address(user_id, &fields("1 Elm"), true).await.unwrap();
        let err = store.insert_address(user_id, &fields("2 Oak"), true).await.unwrap_err();
        assert!(matches!(AddressError::from(err), AddressError::Conflict));
    }
}
