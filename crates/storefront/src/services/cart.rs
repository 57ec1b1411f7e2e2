//! Cart service.
//!
//! Owns the per-product line invariant for persisted carts and the
//! reconciliation of a guest cart into the user's cart at login.

use thiserror::Error;
use tracing::instrument;

use blossom_core::{CartId, ProductId, Quantity, UserId};

use crate::db::{CartStore, ProductStore, RepositoryError};
use crate::models::cart::{AnonymousCart, Cart};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// The product is not in the cart.
    #[error("item not in cart")]
    LineNotFound,

    /// The user's cart could not be loaded or created; nothing was written.
    #[error("cart unavailable: {0}")]
    CartUnavailable(#[source] RepositoryError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart operations for a signed-in user.
pub struct CartService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CartService<'a, S>
where
    S: CartStore + ProductStore + ?Sized,
{
    /// Create a cart service over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The user's cart, created empty on first use.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the database operation fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn cart(&self, user_id: UserId) -> Result<Cart, CartError> {
        if let Some(cart) = self.store.cart_for_user(user_id).await? {
            return Ok(cart);
        }
        let id = self.store.create_cart(user_id).await?;
        Ok(Cart {
            id,
            items: Vec::new(),
        })
    }

    /// Add units of a product, merging into an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id, quantity = %quantity))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, CartError> {
        if self.store.product(product_id).await?.is_none() {
            return Err(CartError::ProductNotFound);
        }

        let cart_id = self.cart_id(user_id).await?;
        self.store.add_quantity(cart_id, product_id, quantity).await?;
        self.cart(user_id).await
    }

    /// Overwrite a line's quantity. Zero or below deletes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the product is not in the cart.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Cart, CartError> {
        let cart_id = self.cart_id(user_id).await?;

        let found = match Quantity::new(quantity) {
            Ok(quantity) => self.store.set_quantity(cart_id, product_id, quantity).await?,
            Err(_) => self.store.remove_line(cart_id, product_id).await?,
        };
        if !found {
            return Err(CartError::LineNotFound);
        }

        self.cart(user_id).await
    }

    /// Delete a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the product is not in the cart.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<Cart, CartError> {
        let cart_id = self.cart_id(user_id).await?;
        if !self.store.remove_line(cart_id, product_id).await? {
            return Err(CartError::LineNotFound);
        }
        self.cart(user_id).await
    }

    /// Fold a guest cart into the user's persisted cart.
    ///
    /// For each guest line the quantity is added to the user's line for that
    /// product, or a new line is created. Lines for products that no longer
    /// exist are skipped.
    ///
    /// Not idempotent: call it once per login and clear the guest cart after
    /// it succeeds. Each line is an independent atomic upsert, so an error
    /// part-way leaves earlier lines applied.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartUnavailable` (with nothing written) if the
    /// user's cart cannot be loaded or created, or `CartError::Repository` if
    /// a line write fails.
    #[instrument(skip(self, anonymous), fields(user_id = %user_id, lines = anonymous.lines().len()))]
    pub async fn merge_carts(
        &self,
        anonymous: &AnonymousCart,
        user_id: UserId,
    ) -> Result<Cart, CartError> {
        let cart_id = self
            .cart_id(user_id)
            .await
            .map_err(|e| match e {
                CartError::Repository(source) => CartError::CartUnavailable(source),
                other => other,
            })?;

        let mut merged = 0_usize;
        for line in anonymous.lines() {
            if self.store.product(line.product_id).await?.is_none() {
                tracing::warn!(product_id = %line.product_id, "Skipping unknown product in guest cart");
                continue;
            }
            self.store
                .add_quantity(cart_id, line.product_id, line.quantity)
                .await?;
            merged += 1;
        }

        tracing::info!(merged, "Merged guest cart");
        self.cart(user_id).await
    }

    async fn cart_id(&self, user_id: UserId) -> Result<CartId, CartError> {
        match self.store.cart_for_user(user_id).await? {
            Some(cart) => Ok(cart.id),
            None => Ok(self.store.create_cart(user_id).await?),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use blossom_core::Price;

    use super::*;
    use crate::db::{CartFault, MemoryStore, UserStore};
    use crate::models::product::NewProduct;
    use crate::models::user::NewUser;

    fn product(store: &MemoryStore, name: &str, cents: u32) -> ProductId {
        store
            .insert_product(NewProduct {
                name: name.to_owned(),
                description: String::new(),
                price: Price::from_cents(cents),
                images: Vec::new(),
                is_new: false,
                is_bestseller: false,
                is_on_sale: false,
                discount_percentage: None,
            })
            .id
    }

    async fn user(store: &MemoryStore) -> UserId {
        store
            .register_user(&NewUser {
                name: "Iris".to_owned(),
                email: blossom_core::Email::parse("iris@blossom.test").unwrap(),
                password_hash: "hash".to_owned(),
            })
            .await
            .unwrap()
            .id
    }

    fn qty(n: i32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_merge_into_empty_then_existing_line() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let p1 = product(&store, "Ranunculus", 1200);
        let service = CartService::new(&store);

        let cart = service
            .merge_carts(&AnonymousCart::from_pairs([(p1, 2)]), user_id)
            .await
            .unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.line(p1).unwrap().quantity.get(), 2);

        let cart = service
            .merge_carts(&AnonymousCart::from_pairs([(p1, 1)]), user_id)
            .await
            .unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.line(p1).unwrap().quantity.get(), 3);
    }

    #[tokio::test]
    async fn test_merge_sums_per_product() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let p1 = product(&store, "Tulip", 500);
        let p2 = product(&store, "Lily", 700);
        let p3 = product(&store, "Orchid", 2500);
        let service = CartService::new(&store);

        service.add_item(user_id, p1, qty(4)).await.unwrap();
        service.add_item(user_id, p2, qty(1)).await.unwrap();

        let guest = AnonymousCart::from_pairs([(p2, 2), (p3, 5), (p2, 1)]);
        let cart = service.merge_carts(&guest, user_id).await.unwrap();

        assert_eq!(cart.items.len(), 3);
        assert_eq!(cart.line(p1).unwrap().quantity.get(), 4);
        assert_eq!(cart.line(p2).unwrap().quantity.get(), 4);
        assert_eq!(cart.line(p3).unwrap().quantity.get(), 5);
        assert_eq!(cart.total_quantity(), 13);
    }

    #[tokio::test]
    async fn test_merge_skips_unknown_products() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let p1 = product(&store, "Dahlia", 900);
        let service = CartService::new(&store);

        let guest = AnonymousCart::from_pairs([(ProductId::new(9999), 3), (p1, 1)]);
        let cart = service.merge_carts(&guest, user_id).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.line(p1).unwrap().quantity.get(), 1);
    }

    #[tokio::test]
    async fn test_merge_writes_nothing_when_cart_unavailable() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let p1 = product(&store, "Gardenia", 1100);
        let p2 = product(&store, "Jasmine", 800);
        let service = CartService::new(&store);
        service.add_item(user_id, p1, qty(2)).await.unwrap();

        store.inject_cart_fault(Some(CartFault::Unavailable));
        let err = service
            .merge_carts(&AnonymousCart::from_pairs([(p1, 1), (p2, 3)]), user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::CartUnavailable(_)));

        store.inject_cart_fault(None);
        let cart = service.cart(user_id).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.line(p1).unwrap().quantity.get(), 2);
    }

    #[tokio::test]
    async fn test_merge_failure_part_way_keeps_applied_lines() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let p1 = product(&store, "Camellia", 1300);
        let p2 = product(&store, "Magnolia", 1900);
        let service = CartService::new(&store);

        store.inject_cart_fault(Some(CartFault::AddQuantityAfter(1)));
        let err = service
            .merge_carts(&AnonymousCart::from_pairs([(p1, 1), (p2, 3)]), user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Repository(_)));

        store.inject_cart_fault(None);
        let cart = service.cart(user_id).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.line(p1).unwrap().quantity.get(), 1);
        assert!(cart.line(p2).is_none());
    }

    #[tokio::test]
    async fn test_line_quantity_saturates() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let p1 = product(&store, "Lotus", 2100);
        let service = CartService::new(&store);

        service.add_item(user_id, p1, qty(i32::MAX)).await.unwrap();
        let cart = service.add_item(user_id, p1, qty(i32::MAX)).await.unwrap();
        assert_eq!(cart.line(p1).unwrap().quantity.get(), i32::MAX);
    }

    #[tokio::test]
    async fn test_update_to_zero_deletes_line() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let p1 = product(&store, "Peony", 1500);
        let service = CartService::new(&store);

        service.add_item(user_id, p1, qty(2)).await.unwrap();
        let cart = service.update_quantity(user_id, p1, 7).await.unwrap();
        assert_eq!(cart.line(p1).unwrap().quantity.get(), 7);

        let cart = service.update_quantity(user_id, p1, 0).await.unwrap();
        assert!(cart.items.is_empty());

        let err = service.update_quantity(user_id, p1, 1).await.unwrap_err();
        assert!(matches!(err, CartError::LineNotFound));
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let service = CartService::new(&store);

        let err = service
            .add_item(user_id, ProductId::new(42), Quantity::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound));
    }

    #[tokio::test]
    async fn test_subtotal_uses_sale_price() {
        let store = MemoryStore::new();
        let user_id = user(&store).await;
        let p1 = store
            .insert_product(NewProduct {
                name: "Sunflower".to_owned(),
                description: String::new(),
                price: Price::from_cents(1000),
                images: Vec::new(),
                is_new: false,
                is_bestseller: false,
                is_on_sale: true,
                discount_percentage: Some(50),
            })
            .id;
        let service = CartService::new(&store);

        let cart = service.add_item(user_id, p1, qty(3)).await.unwrap();
        assert_eq!(cart.subtotal(), Price::from_cents(1500));
    }
}
