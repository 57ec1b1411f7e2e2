//! Shipping address types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use blossom_core::{AddressId, UserId};

/// A user's shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    /// At most one of a user's addresses has this set.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raised when required address fields are missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required address fields: {}", .missing.join(", "))]
pub struct AddressFieldsError {
    /// Wire names of the offending fields.
    pub missing: Vec<&'static str>,
}

/// Validated, trimmed address fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFields {
    street: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
}

impl AddressFields {
    /// Validate raw input. Every field is required and must not be blank.
    ///
    /// # Errors
    ///
    /// Returns [`AddressFieldsError`] listing every missing field.
    pub fn parse(
        street: Option<&str>,
        city: Option<&str>,
        state: Option<&str>,
        postal_code: Option<&str>,
        country: Option<&str>,
    ) -> Result<Self, AddressFieldsError> {
        let mut missing = Vec::new();
        let mut take = |value: Option<&str>, name: &'static str| {
            let trimmed = value.map(str::trim).unwrap_or_default();
            if trimmed.is_empty() {
                missing.push(name);
            }
            trimmed.to_owned()
        };

        let fields = Self {
            street: take(street, "street"),
            city: take(city, "city"),
            state: take(state, "state"),
            postal_code: take(postal_code, "postalCode"),
            country: take(country, "country"),
        };

        if missing.is_empty() {
            Ok(fields)
        } else {
            Err(AddressFieldsError { missing })
        }
    }

    #[must_use]
    pub fn street(&self) -> &str {
        &self.street
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    #[must_use]
    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }
}
