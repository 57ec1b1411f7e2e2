//! Catalog queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use blossom_core::{Price, ProductId};

use super::{PgStore, ProductStore, RepositoryError};
use crate::models::product::{NewProduct, Product, ProductSummary};

const PRODUCT_COLUMNS: &str = "id, name, description, price, images, is_new, is_bestseller, \
                               is_on_sale, discount_percentage, created_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Price,
    images: Vec<String>,
    is_new: bool,
    is_bestseller: bool,
    is_on_sale: bool,
    discount_percentage: Option<i16>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            images: row.images,
            is_new: row.is_new,
            is_bestseller: row.is_bestseller,
            is_on_sale: row.is_on_sale,
            discount_percentage: discount(row.discount_percentage)?,
            created_at: row.created_at,
        })
    }
}

/// Product columns joined into cart, wishlist and order line queries.
///
/// Joined queries alias them with a `product_` prefix.
#[derive(sqlx::FromRow)]
pub(super) struct ProductSummaryRow {
    product_id: ProductId,
    product_name: String,
    product_price: Price,
    product_images: Vec<String>,
    product_is_on_sale: bool,
    product_discount_percentage: Option<i16>,
}

/// Select list matching [`ProductSummaryRow`] for a `storefront.product` aliased as `p`.
pub(super) const PRODUCT_SUMMARY_COLUMNS: &str = "p.id AS product_id, p.name AS product_name, \
     p.price AS product_price, p.images AS product_images, \
     p.is_on_sale AS product_is_on_sale, p.discount_percentage AS product_discount_percentage";

impl TryFrom<ProductSummaryRow> for ProductSummary {
    type Error = RepositoryError;

    fn try_from(row: ProductSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.product_id,
            name: row.product_name,
            price: row.product_price,
            images: row.product_images,
            is_on_sale: row.product_is_on_sale,
            discount_percentage: discount(row.product_discount_percentage)?,
        })
    }
}

fn discount(raw: Option<i16>) -> Result<Option<u8>, RepositoryError> {
    raw.map(|value| {
        u8::try_from(value)
            .ok()
            .filter(|percent| *percent <= 100)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!("invalid discount percentage: {value}"))
            })
    })
    .transpose()
}

#[async_trait]
impl ProductStore for PgStore {
    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }
}

/// Insert a catalog product (used by the seeding CLI).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_product(
    store: &PgStore,
    product: &NewProduct,
) -> Result<ProductId, RepositoryError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO storefront.product
            (name, description, price, images, is_new, is_bestseller, is_on_sale, discount_percentage)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        ",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.images)
    .bind(product.is_new)
    .bind(product.is_bestseller)
    .bind(product.is_on_sale)
    .bind(product.discount_percentage.map(i16::from))
    .fetch_one(&store.pool)
    .await?;

    Ok(id)
}
