//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Blush Peony Bouquet
//!     description: Twelve stems of seasonal peonies.
//!     price: "48.00"
//!     images: [/images/peony.jpg]
//!     isBestseller: true
//!     isOnSale: true
//!     discountPercentage: 10
//! ```
//!
//! The whole file is parsed and validated before the database is touched.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use blossom_storefront::db::{self, PgStore};
use blossom_storefront::models::NewProduct;

use super::{CommandError, database_url};

/// Top level of a seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    pub products: Vec<NewProduct>,
}

impl SeedFile {
    /// Every validation problem in the file.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        self.products
            .iter()
            .enumerate()
            .filter_map(|(i, product)| {
                product
                    .validate()
                    .err()
                    .map(|e| format!("product #{}: {e}", i + 1))
            })
            .collect()
    }
}

/// Insert every product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any product is
/// invalid, or an insert fails. Products inserted before a failing insert
/// are kept.
pub async fn products(file_path: &str) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading products from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(products = seed.products.len(), "Parsed seed file");

    let errors = seed.validate();
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CommandError::Validation(errors.len()));
    }

    let pool = db::create_pool(&database_url()?).await?;
    let store = PgStore::new(pool);
    info!("Connected to database");

    for product in &seed.products {
        let id = db::products::insert_product(&store, product).await?;
        info!(product_id = %id, name = %product.name, "Inserted product");
    }

    info!(count = seed.products.len(), "Seeding complete");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_camel_case_products() {
        let seed: SeedFile = serde_yaml::from_str(
            r#"
products:
  - name: Blush Peony Bouquet
    price: "48.00"
    isOnSale: true
    discountPercentage: 10
  - name: Sunflower Bunch
    price: "19.50"
"#,
        )
        .unwrap();

        assert_eq!(seed.products.len(), 2);
        assert!(seed.products[0].is_on_sale);
        assert!(seed.products[1].images.is_empty());
        assert!(seed.validate().is_empty());
    }

    #[test]
    fn test_reports_every_invalid_product() {
        let seed: SeedFile = serde_yaml::from_str(
            r#"
products:
  - name: "  "
    price: "5.00"
  - name: Tulips
    price: "12.00"
  - name: Orchid
    price: "30.00"
    discountPercentage: 150
"#,
        )
        .unwrap();

        let errors = seed.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("product #1"));
        assert!(errors[1].starts_with("product #3"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let result = serde_yaml::from_str::<SeedFile>(
            "products:\n  - name: Rose\n    price: \"3.00\"\n    colour: red\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_negative_price() {
        let result =
            serde_yaml::from_str::<SeedFile>("products:\n  - name: Rose\n    price: \"-3.00\"\n");
        assert!(result.is_err());
    }
}
