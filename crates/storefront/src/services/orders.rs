//! Order history for the signed-in user.

use tracing::instrument;

use blossom_core::{OrderId, UserId};

use crate::db::{OrderStore, RepositoryError};
use crate::models::order::Order;

/// Read-only order queries.
pub struct OrderService<'a, S: ?Sized> {
    orders: &'a S,
}

impl<'a, S: OrderStore + ?Sized> OrderService<'a, S> {
    #[must_use]
    pub const fn new(orders: &'a S) -> Self {
        Self { orders }
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.orders.orders_for_user(user_id).await
    }

    /// One of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist or
    /// belongs to someone else.
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn get(&self, user_id: UserId, order_id: OrderId) -> Result<Order, RepositoryError> {
        self.orders
            .order_for_user(user_id, order_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
