//! Type-safe price representation using decimal arithmetic.
//!
//! The storefront trades in a single display currency, so a price is a
//! bare decimal amount. Arithmetic stays in `rust_decimal::Decimal` to
//! avoid binary floating-point drift in cart totals.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-negative monetary amount in the storefront's display currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price from a decimal amount.
    ///
    /// Negative amounts are clamped to zero; the backend never issues
    /// negative unit prices, so a negative here is a decode artifact.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            Self(Decimal::ZERO)
        } else {
            Self(amount)
        }
    }

    /// Create a price from an amount in hundredths (e.g., cents).
    #[must_use]
    pub fn from_minor_units(minor: i64) -> Self {
        Self::new(Decimal::new(minor, 2))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity to get a line total.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl fmt::Display for Price {
    /// Format for display (e.g., "$19.99").
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        self.times(rhs)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_amount_clamped() {
        let price = Price::new(Decimal::new(-500, 2));
        assert_eq!(price, Price::ZERO);
    }

    #[test]
    fn test_line_total() {
        let price = Price::from_minor_units(1050); // $10.50
        assert_eq!(price.times(3), Price::from_minor_units(3150));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_minor_units(599).to_string(), "$5.99");
        assert_eq!(Price::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_sum() {
        let total: Price = [
            Price::from_minor_units(100),
            Price::from_minor_units(250),
            Price::from_minor_units(50),
        ]
        .into_iter()
        .sum();
        assert_eq!(total, Price::from_minor_units(400));
    }

    #[test]
    fn test_exact_decimal_arithmetic() {
        // 0.1 + 0.2 is exactly 0.3 in decimal, unlike f64
        let total = Price::from_minor_units(10) + Price::from_minor_units(20);
        assert_eq!(total, Price::from_minor_units(30));
    }
}
