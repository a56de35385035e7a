//! Type-safe money representation using decimal arithmetic.
//!
//! The marketplace trades in Tanzanian shillings only, so amounts carry no
//! currency code. On the wire they are decimal strings (`"1500.00"`); numbers are
//! accepted when decoding.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of Tanzanian shillings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero shillings.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_tzs(self.0))
    }
}

/// Format an amount for display, e.g. `12,500.50 TZS`.
///
/// Whole amounts drop the fractional part, matching how the storefront shows
/// catalogue prices.
#[must_use]
pub fn format_tzs(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let text = rounded.abs().to_string();
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    if frac.is_empty() {
        format!("{sign}{grouped} TZS")
    } else {
        format!("{sign}{grouped}.{frac:0<2} TZS")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_decodes_from_string_and_number() {
        let a: Money = serde_json::from_str("\"1500.00\"").unwrap();
        let b: Money = serde_json::from_str("1500").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_money_encodes_as_string() {
        let m = Money::new(Decimal::new(150_050, 2));
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"1500.50\"");
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Money::new(Decimal::new(2_500, 0));
        let total: Money = [unit.times(2), unit.times(3)].into_iter().sum();
        assert_eq!(total, Money::new(Decimal::new(12_500, 0)));
    }

    #[test]
    fn test_format_tzs() {
        assert_eq!(format_tzs(Decimal::new(12_500, 0)), "12,500 TZS");
        assert_eq!(format_tzs(Decimal::new(1_250_050, 2)), "12,500.50 TZS");
        assert_eq!(format_tzs(Decimal::new(999, 0)), "999 TZS");
        assert_eq!(format_tzs(Decimal::new(1_000_000, 0)), "1,000,000 TZS");
        assert_eq!(format_tzs(Decimal::new(-1_500, 0)), "-1,500 TZS");
    }
}
