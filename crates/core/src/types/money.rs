//! Non-negative money amounts using decimal arithmetic.
//!
//! Prices are stored and summed as [`Decimal`] so that `3 x $0.10` is exactly
//! `$0.30`. The shop trades in a single currency (USD), so no currency code is
//! carried around.

use core::fmt;
use core::iter::Sum;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Money`] amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("not a valid amount: {0}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
}

/// A non-negative amount of money in dollars.
///
/// Displays with a leading `$` and exactly two decimal places.
///
/// ```
/// use bazaar_core::Money;
///
/// let price = Money::parse("19.9").unwrap();
/// assert_eq!(price.to_string(), "$19.90");
/// assert_eq!(price.times(3).to_string(), "$59.70");
/// assert!(Money::parse("-1").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        Ok(Self(amount))
    }

    /// Parse an amount such as `"12"`, `"12.5"` or `" 12.50 "`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] for non-numeric input and
    /// [`MoneyError::Negative`] for amounts below zero.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let trimmed = s.trim().trim_start_matches('$');
        let amount =
            Decimal::from_str(trimmed).map_err(|_| MoneyError::Invalid(s.trim().to_owned()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// This amount multiplied by a quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Two-decimal rendering without the currency symbol (e.g. `19.90`).
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        format!("{:.2}", self.0.round_dp(2))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0.round_dp(2))
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl core::ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_amounts() {
        assert_eq!(Money::parse("0").unwrap(), Money::ZERO);
        assert_eq!(Money::parse("12.5").unwrap().to_string(), "$12.50");
        assert_eq!(Money::parse(" $7 ").unwrap().to_string(), "$7.00");
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert_eq!(Money::parse("-0.01"), Err(MoneyError::Negative));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert!(Money::parse("-0").is_ok());
    }

    #[test]
    fn test_parse_rejects_text() {
        assert!(matches!(Money::parse("ten"), Err(MoneyError::Invalid(_))));
    }

    #[test]
    fn test_times_is_exact() {
        let dime = Money::parse("0.10").unwrap();
        assert_eq!(dime.times(3), Money::parse("0.30").unwrap());
        assert_eq!(dime.times(0), Money::ZERO);
    }

    #[test]
    fn test_sum() {
        let total: Money = ["1.25", "2.50", "0.25"]
            .iter()
            .map(|s| Money::parse(s).unwrap())
            .sum();
        assert_eq!(total.to_string(), "$4.00");
    }

    #[test]
    fn test_plain_string() {
        assert_eq!(Money::parse("3").unwrap().to_plain_string(), "3.00");
    }

    #[test]
    fn test_serde_rejects_negative() {
        let parsed: Result<Money, _> = serde_json::from_str("\"-5\"");
        assert!(parsed.is_err());
        let parsed: Money = serde_json::from_str("\"5.5\"").unwrap();
        assert_eq!(parsed.to_string(), "$5.50");
    }
}
