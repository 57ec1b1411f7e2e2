//! Catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use blossom_core::{Price, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// List price before any discount.
    pub price: Price,
    pub images: Vec<String>,
    pub is_new: bool,
    pub is_bestseller: bool,
    pub is_on_sale: bool,
    /// Percentage off the list price while `is_on_sale` (0-100).
    pub discount_percentage: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price a customer pays for one unit right now.
    #[must_use]
    pub fn sale_price(&self) -> Price {
        effective_price(self.price, self.is_on_sale, self.discount_percentage)
    }

    /// The fields cart, wishlist and order lines show.
    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            images: self.images.clone(),
            is_on_sale: self.is_on_sale,
            discount_percentage: self.discount_percentage,
        }
    }
}

/// Product fields embedded in cart, wishlist and order lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub images: Vec<String>,
    pub is_on_sale: bool,
    pub discount_percentage: Option<u8>,
}

impl ProductSummary {
    /// Price a customer pays for one unit right now.
    #[must_use]
    pub fn sale_price(&self) -> Price {
        effective_price(self.price, self.is_on_sale, self.discount_percentage)
    }
}

/// A catalog entry to insert, as read from a seed file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub is_on_sale: bool,
    #[serde(default)]
    pub discount_percentage: Option<u8>,
}

impl NewProduct {
    /// Check the fields the database constraints would otherwise reject.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name cannot be blank".to_owned());
        }
        if let Some(percent) = self.discount_percentage
            && percent > 100
        {
            return Err(format!(
                "{}: discount percentage must be 0-100 (got {percent})",
                self.name
            ));
        }
        Ok(())
    }
}

fn effective_price(price: Price, on_sale: bool, discount: Option<u8>) -> Price {
    match discount {
        Some(percent) if on_sale => price.discounted(percent),
        _ => price,
    }
}
