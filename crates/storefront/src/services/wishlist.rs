//! Wishlist service.

use thiserror::Error;
use tracing::instrument;

use blossom_core::{ProductId, UserId, WishlistId};

use crate::db::{ProductStore, RepositoryError, WishlistStore};
use crate::models::wishlist::Wishlist;

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// The product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Wishlist operations for a signed-in user.
pub struct WishlistService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> WishlistService<'a, S>
where
    S: WishlistStore + ProductStore + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The user's wishlist, created empty on first use.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if the database operation fails.
    pub async fn list(&self, user_id: UserId) -> Result<Wishlist, WishlistError> {
        if let Some(wishlist) = self.store.wishlist_for_user(user_id).await? {
            return Ok(wishlist);
        }
        let id = self.store.create_wishlist(user_id).await?;
        Ok(Wishlist {
            id,
            items: Vec::new(),
        })
    }

    /// Save a product. Saving it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<Wishlist, WishlistError> {
        if self.store.product(product_id).await?.is_none() {
            return Err(WishlistError::ProductNotFound);
        }
        let id = self.wishlist_id(user_id).await?;
        self.store.add_to_wishlist(id, product_id).await?;
        self.list(user_id).await
    }

    /// Remove a product if present.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if the database operation fails.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Wishlist, WishlistError> {
        let id = self.wishlist_id(user_id).await?;
        self.store.remove_from_wishlist(id, product_id).await?;
        self.list(user_id).await
    }

    async fn wishlist_id(&self, user_id: UserId) -> Result<WishlistId, WishlistError> {
        Ok(self.store.create_wishlist(user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use blossom_core::{Email, Price};

    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::product::NewProduct;
    use crate::models::user::NewUser;

    #[tokio::test]
    async fn test_add_is_idempotent_and_remove_works() {
        let store = MemoryStore::new();
        let user_id = store
            .register_user(&NewUser {
                name: "Basil".to_owned(),
                email: Email::parse("basil@blossom.test").unwrap(),
                password_hash: "hash".to_owned(),
            })
            .await
            .unwrap()
            .id;
        let lily = store
            .insert_product(NewProduct {
                name: "Lily".to_owned(),
                description: String::new(),
                price: Price::from_cents(1100),
                images: Vec::new(),
                is_new: true,
                is_bestseller: false,
                is_on_sale: false,
                discount_percentage: None,
            })
            .id;
        let service = WishlistService::new(&store);

        service.add(user_id, lily).await.unwrap();
        let wishlist = service.add(user_id, lily).await.unwrap();
        assert_eq!(wishlist.items.len(), 1);

        let wishlist = service.remove(user_id, lily).await.unwrap();
        assert!(wishlist.items.is_empty());

        assert!(matches!(
            service.add(user_id, ProductId::new(404)).await,
            Err(WishlistError::ProductNotFound)
        ));
    }
}
