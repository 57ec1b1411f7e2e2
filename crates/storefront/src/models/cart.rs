//! Cart types: the persisted cart and the guest cart held in the session.

use serde::{Deserialize, Serialize};

use blossom_core::{CartId, CartItemId, Price, ProductId, Quantity};

use super::product::ProductSummary;

/// A user's persisted cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    /// At most one line per product, in insertion order.
    pub items: Vec<CartLine>,
}

impl Cart {
    /// The line for `product_id`, if any.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.product.id == product_id)
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|line| i64::from(line.quantity.get())).sum()
    }

    /// Sum of line totals at current sale prices.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items
            .iter()
            .map(|line| line.product.sale_price().times(line.quantity.get()))
            .sum()
    }
}

/// One product in a persisted cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub quantity: Quantity,
    pub product: ProductSummary,
}

/// A guest cart, stored in the session until the visitor logs in.
///
/// Holds the same invariant as a persisted cart: one line per product, every
/// quantity at least 1. On login it is handed to
/// [`CartService::merge_carts`](crate::services::cart::CartService::merge_carts)
/// and then cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousCart {
    lines: Vec<AnonymousCartLine>,
}

/// One product in a guest cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousCartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl AnonymousCart {
    /// Build a cart from client-supplied `(product, quantity)` pairs.
    ///
    /// Pairs for the same product are summed; non-positive quantities are dropped.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ProductId, i32)>) -> Self {
        let mut cart = Self::default();
        for (product_id, raw) in pairs {
            if let Ok(quantity) = Quantity::new(raw) {
                cart.add(product_id, quantity);
            }
        }
        cart
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[AnonymousCartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity.get())).sum()
    }

    /// Add units of a product, merging into an existing line.
    pub fn add(&mut self, product_id: ProductId, quantity: Quantity) {
        match self.lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(AnonymousCartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Overwrite a line's quantity; zero or below removes the line.
    ///
    /// Returns `false` if the product was not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, raw: i32) -> bool {
        let Ok(quantity) = Quantity::new(raw) else {
            return self.remove(product_id);
        };
        match self.lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a product. Returns `false` if it was not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pid(id: i32) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = AnonymousCart::default();
        cart.add(pid(1), Quantity::new(2).unwrap());
        cart.add(pid(2), Quantity::ONE);
        cart.add(pid(1), Quantity::ONE);

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity.get(), 3);
        assert_eq!(cart.total_quantity(), 4);
    }

    #[test]
    fn test_from_pairs_coalesces_and_skips_non_positive() {
        let cart = AnonymousCart::from_pairs([(pid(1), 2), (pid(2), 0), (pid(1), 3), (pid(3), -1)]);
        assert_eq!(
            cart.lines(),
            &[AnonymousCartLine {
                product_id: pid(1),
                quantity: Quantity::new(5).unwrap(),
            }]
        );
    }

    #[test]
    fn test_set_quantity_to_zero_removes_line() {
        let mut cart = AnonymousCart::from_pairs([(pid(1), 2)]);
        assert!(cart.set_quantity(pid(1), 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(pid(1), 4));
    }

    #[test]
    fn test_session_round_trip_revalidates() {
        let cart = AnonymousCart::from_pairs([(pid(7), 2)]);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["lines"][0]["productId"], 7);
        let back: AnonymousCart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);

        let tampered = serde_json::json!({ "lines": [{ "productId": 7, "quantity": 0 }] });
        assert!(serde_json::from_value::<AnonymousCart>(tampered).is_err());
    }
}
