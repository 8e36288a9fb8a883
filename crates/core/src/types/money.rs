//! Type-safe money representation using decimal arithmetic.
//!
//! Prices cross the wire either as JSON numbers or as display strings with a
//! currency-symbol prefix (`"$4.99"`). They are parsed into [`Money`] once,
//! at the API boundary, and every later computation works on the decimal
//! value. Nothing inside the client formats a price and parses it back.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing or combining [`Money`] values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input string is empty (after removing the currency symbol).
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("price is not a number: {0:?}")]
    NotANumber(String),
    /// Two amounts in different currencies were combined.
    #[error("cannot combine {left} with {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: CurrencyCode,
        /// Currency of the right operand.
        right: CurrencyCode,
    },
    /// Unknown ISO 4217 code.
    #[error("unsupported currency code: {0}")]
    UnknownCurrency(String),
}

/// ISO 4217 currency codes supported by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    VND,
}

impl CurrencyCode {
    /// Symbol used as a display prefix.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::VND => "₫",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::VND => "VND",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "VND" => Ok(Self::VND),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// A decimal amount with its currency.
///
/// ```
/// use freshcart_core::{CurrencyCode, Money};
///
/// let price = Money::parse("$4.99", CurrencyCode::USD).unwrap();
/// assert_eq!(price.times(2).to_string(), "$9.98");
///
/// assert!(Money::parse("$4.9x", CurrencyCode::USD).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Parse a price that may carry the currency symbol or ISO code as a
    /// prefix (`"$4.99"`, `"USD 4.99"`, `"4.99"`).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Empty`] for blank input and
    /// [`MoneyError::NotANumber`] when the remainder is not a decimal. A
    /// malformed price is never coerced to zero.
    pub fn parse(input: &str, currency: CurrencyCode) -> Result<Self, MoneyError> {
        let trimmed = input.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let digits = unsigned
            .strip_prefix(currency.symbol())
            .or_else(|| unsigned.strip_prefix(currency.code()))
            .unwrap_or(unsigned)
            .trim();

        if digits.is_empty() {
            return Err(MoneyError::Empty);
        }
        // Decimal::from_str accepts a leading sign; the sign was handled above.
        if digits.starts_with(['-', '+']) {
            return Err(MoneyError::NotANumber(input.to_string()));
        }

        // JSON floats such as 1e-7 arrive in exponent form.
        let amount = Decimal::from_str(digits)
            .or_else(|_| Decimal::from_scientific(digits))
            .map_err(|_| MoneyError::NotANumber(input.to_string()))?;

        Ok(Self::new(if negative { -amount } else { amount }, currency))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Whether the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(
            self.amount.saturating_mul(Decimal::from(quantity)),
            self.currency,
        )
    }

    /// Add two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if the currencies differ.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.same_currency(other)?;
        Ok(Self::new(
            self.amount.saturating_add(other.amount),
            self.currency,
        ))
    }

    /// Subtract an amount of the same currency. The result may be negative.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if the currencies differ.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        self.same_currency(other)?;
        Ok(Self::new(
            self.amount.saturating_sub(other.amount),
            self.currency,
        ))
    }

    /// Subtract, flooring the result at zero.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if the currencies differ.
    pub fn saturating_sub(self, other: Self) -> Result<Self, MoneyError> {
        let difference = self.checked_sub(other)?;
        Ok(if difference.is_negative() {
            Self::zero(self.currency)
        } else {
            difference
        })
    }

    /// Sum amounts, all of which must be in `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] on the first foreign amount.
    pub fn sum<I>(currency: CurrencyCode, amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::zero(currency), Self::checked_add)
    }

    fn same_currency(self, other: Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            })
        }
    }
}

impl fmt::Display for Money {
    /// Formats as symbol plus two decimals (e.g., `"$19.99"`, `"-$1.00"`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.amount.round_dp(2);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-{}{:.2}", self.currency.symbol(), rounded.abs())
        } else {
            write!(f, "{}{:.2}", self.currency.symbol(), rounded.abs())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, CurrencyCode::USD)
    }

    #[test]
    fn test_parse_with_symbol_code_or_bare() {
        assert_eq!(Money::parse("$4.99", CurrencyCode::USD).unwrap(), usd(dec!(4.99)));
        assert_eq!(Money::parse("USD 4.99", CurrencyCode::USD).unwrap(), usd(dec!(4.99)));
        assert_eq!(Money::parse(" 12 ", CurrencyCode::USD).unwrap(), usd(dec!(12)));
        assert_eq!(Money::parse("-$1.50", CurrencyCode::USD).unwrap(), usd(dec!(-1.50)));
        assert_eq!(Money::parse("2.5e-3", CurrencyCode::USD).unwrap(), usd(dec!(0.0025)));
        assert_eq!(Money::parse("$1e3", CurrencyCode::USD).unwrap(), usd(dec!(1000)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Money::parse("", CurrencyCode::USD), Err(MoneyError::Empty));
        assert_eq!(Money::parse("$", CurrencyCode::USD), Err(MoneyError::Empty));
        assert!(matches!(
            Money::parse("$abc", CurrencyCode::USD),
            Err(MoneyError::NotANumber(_))
        ));
        assert!(matches!(
            Money::parse("$4.99$", CurrencyCode::USD),
            Err(MoneyError::NotANumber(_))
        ));
        assert!(matches!(
            Money::parse("--4", CurrencyCode::USD),
            Err(MoneyError::NotANumber(_))
        ));
        // Foreign symbol is not silently stripped.
        assert!(matches!(
            Money::parse("€4.99", CurrencyCode::USD),
            Err(MoneyError::NotANumber(_))
        ));
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(usd(dec!(4.99)).times(2).to_string(), "$9.98");
        assert_eq!(usd(dec!(5)).to_string(), "$5.00");
        assert_eq!(usd(dec!(-1)).to_string(), "-$1.00");
        assert_eq!(Money::new(dec!(3.456), CurrencyCode::GBP).to_string(), "£3.46");
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let total = usd(dec!(3.00)).saturating_sub(usd(dec!(5))).unwrap();
        assert!(total.is_zero());

        let total = usd(dec!(9.98)).saturating_sub(usd(dec!(5))).unwrap();
        assert_eq!(total, usd(dec!(4.98)));
    }

    #[test]
    fn test_currency_mismatch() {
        let eur = Money::new(dec!(1), CurrencyCode::EUR);
        assert!(matches!(
            usd(dec!(1)).checked_add(eur),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
        assert!(Money::sum(CurrencyCode::USD, [usd(dec!(1)), eur]).is_err());
    }

    #[test]
    fn test_sum() {
        let total = Money::sum(
            CurrencyCode::USD,
            [usd(dec!(4.99)).times(2), usd(dec!(0.02))],
        )
        .unwrap();
        assert_eq!(total, usd(dec!(10.00)));
        assert!(Money::sum(CurrencyCode::USD, []).unwrap().is_zero());
    }

    #[test]
    fn test_currency_code_from_str() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
