//! Order history types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use blossom_core::{OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, Price, Quantity};

use super::address::Address;
use super::product::ProductSummary;

/// A placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub total: Price,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLine>,
    /// Shipping address. Only loaded for order detail, and `None` if the
    /// address has since been deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// One line of an order, priced at the time of purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: OrderItemId,
    pub quantity: Quantity,
    /// Unit price paid.
    pub price: Price,
    pub product: ProductSummary,
}
