//! Money amounts using decimal arithmetic.
//!
//! Local product prices are stored as `NUMERIC(10,2)` in major units
//! (dollars). The payment provider reports amounts as integer minor units
//! (cents). `Money` converts between the two and formats for display.

use core::fmt;
use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Build an amount from integer minor units (e.g., 2000 cents = 20.00).
    ///
    /// ```
    /// use emporium_core::{CurrencyCode, Money};
    ///
    /// let price = Money::from_minor_units(1999, CurrencyCode::USD);
    /// assert_eq!(price.to_string(), "$19.99");
    /// ```
    #[must_use]
    pub fn from_minor_units(units: i64, currency_code: CurrencyCode) -> Self {
        Self::new(
            Decimal::new(units, currency_code.minor_digits()),
            currency_code,
        )
    }

    /// Convert to integer minor units, rounding half away from zero.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        let scale = Decimal::from(10_i64.pow(self.currency_code.minor_digits()));
        (self.amount * scale)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.currency_code.minor_digits() as usize;
        let rounded = self.amount.round_dp_with_strategy(
            self.currency_code.minor_digits(),
            RoundingStrategy::MidpointAwayFromZero,
        );
        write!(f, "{}{rounded:.digits$}", self.currency_code.symbol())
    }
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Lowercase code as used by the payment provider API.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }

    /// Number of minor-unit digits. All supported currencies use cents.
    #[must_use]
    pub const fn minor_digits(self) -> u32 {
        2
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "gbp" => Ok(Self::GBP),
            "cad" => Ok(Self::CAD),
            "aud" => Ok(Self::AUD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_to_cents() {
        let price = Money::new(Decimal::new(30, 0), CurrencyCode::USD);
        assert_eq!(price.to_string(), "$30.00");

        let price = Money::new(Decimal::new(12_345, 3), CurrencyCode::GBP);
        assert_eq!(price.to_string(), "£12.35");
    }

    #[test]
    fn test_minor_units_conversion() {
        let price = Money::from_minor_units(2_000, CurrencyCode::USD);
        assert_eq!(price.amount, Decimal::new(20, 0));
        assert_eq!(price.to_minor_units(), Some(2_000));

        let price = Money::new(Decimal::new(1_0005, 3), CurrencyCode::EUR);
        assert_eq!(price.to_minor_units(), Some(1_001));
    }

    #[test]
    fn test_is_positive() {
        assert!(Money::from_minor_units(1, CurrencyCode::USD).is_positive());
        assert!(!Money::zero(CurrencyCode::USD).is_positive());
        assert!(!Money::from_minor_units(-5, CurrencyCode::USD).is_positive());
    }

    #[test]
    fn test_currency_from_provider_code() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("EUR".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("xyz".parse::<CurrencyCode>().is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_minor_units_survive_conversion(units in -1_000_000_000_i64..1_000_000_000) {
            let money = Money::from_minor_units(units, CurrencyCode::USD);
            proptest::prop_assert_eq!(money.to_minor_units(), Some(units));
        }
    }
}
