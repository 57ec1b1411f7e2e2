//! Monetary amounts using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Error returned for negative prices.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("price cannot be negative (got {0})")]
pub struct PriceError(pub Decimal);

/// A non-negative amount in the store currency.
///
/// Serialized as a decimal string (`"24.50"`) so clients never see binary
/// floating point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if `amount` is negative.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError(amount));
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// Create a price from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Price after a percentage discount, rounded to cents.
    ///
    /// Percentages above 100 are treated as 100.
    #[must_use]
    pub fn discounted(self, percent: u8) -> Self {
        let percent = Decimal::from(percent.min(100));
        let factor = (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED;
        Self((self.0 * factor).round_dp(2))
    }

    /// Price of `units` items at this unit price.
    #[must_use]
    pub fn times(self, units: i32) -> Self {
        Self((self.0 * Decimal::from(units.max(0))).round_dp(2))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|p| p.0).sum())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(Price::new(Decimal::new(-1, 2)).is_err());
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_discount_rounds_to_cents() {
        let price = Price::from_cents(1999);
        assert_eq!(price.discounted(15).to_string(), "$16.99");
        assert_eq!(price.discounted(200), Price::ZERO);
        assert_eq!(price.discounted(0), price);
    }

    #[test]
    fn test_line_totals_sum() {
        let total: Price = [Price::from_cents(250).times(3), Price::from_cents(1000).times(1)]
            .into_iter()
            .sum();
        assert_eq!(total.to_string(), "$17.50");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Price::from_cents(2450)).unwrap();
        assert_eq!(json, "\"24.50\"");
    }

    #[test]
    fn test_deserialize_validates() {
        let price: Price = serde_json::from_str("\"24.50\"").unwrap();
        assert_eq!(price, Price::from_cents(2450));
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}
