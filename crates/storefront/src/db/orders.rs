//! Order history queries.
//!
//! Orders are written by checkout, which lives outside this service; the
//! storefront only reads them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use blossom_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, Price, Quantity,
    UserId,
};

use super::addresses::{ADDRESS_COLUMNS, AddressRow};
use super::products::{PRODUCT_SUMMARY_COLUMNS, ProductSummaryRow};
use super::{OrderStore, PgStore, RepositoryError};
use crate::models::address::Address;
use crate::models::order::{Order, OrderLine};

const ORDER_COLUMNS: &str =
    "id, address_id, status, payment_status, payment_method, total, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    address_id: Option<AddressId>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    total: Price,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    id: OrderItemId,
    quantity: Quantity,
    price: Price,
    #[sqlx(flatten)]
    product: ProductSummaryRow,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            total: self.total,
            created_at: self.created_at,
            items,
            address: None,
        }
    }
}

impl PgStore {
    /// Load lines for a set of orders, grouped by order.
    async fn order_lines(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        let sql = format!(
            r"
            SELECT oi.order_id, oi.id, oi.quantity, oi.price, {PRODUCT_SUMMARY_COLUMNS}
            FROM storefront.order_item oi
            JOIN storefront.product p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id
            "
        );
        let rows = sqlx::query_as::<_, OrderLineRow>(&sql)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            lines.entry(row.order_id).or_default().push(OrderLine {
                id: row.id,
                quantity: row.quantity,
                price: row.price,
                product: row.product.try_into()?,
            });
        }
        Ok(lines)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM storefront.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id.as_i32()).collect();
        let mut lines = self.order_lines(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = lines.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }

    async fn order_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE id = $1 AND user_id = $2"
        );
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        // Not scoped by owner: the address was the owner's when the order was placed.
        let address = match row.address_id {
            Some(address_id) => {
                let sql = format!("SELECT {ADDRESS_COLUMNS} FROM storefront.address WHERE id = $1");
                sqlx::query_as::<_, AddressRow>(&sql)
                    .bind(address_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(Address::from)
            }
            None => None,
        };

        let mut lines = self.order_lines(&[row.id.as_i32()]).await?;
        let items = lines.remove(&row.id).unwrap_or_default();

        let mut order = row.into_order(items);
        order.address = address;
        Ok(Some(order))
    }
}
