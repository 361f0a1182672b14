//! # Money Module
//!
//! The `Money` type every total, subtotal, received amount and change
//! amount in the checkout engine flows through.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  REPEATED PAY/UPDATE CYCLES                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │    change = received - total drifts after a few edits                   │
//! │                                                                         │
//! │  With integer cents:                                                    │
//! │    10 + 20 = 30, change = 5000 - 5000 = 0 exactly, every time           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use qlaris_core::money::Money;
//!
//! let price = Money::from_cents(1000);                  // $10.00
//! let subtotal = price.checked_mul_quantity(3).unwrap(); // $30.00
//! let change = Money::from_cents(5000) - subtotal;
//! assert_eq!(change.cents(), 2000);
//! ```
//!
//! Cart arithmetic goes through the `checked_*` methods: prices come from
//! stored rows, so a subtotal or total that doesn't fit in an i64 is an
//! input error, not a panic or a wrapped negative total.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► PricedLine.unit_price ──► PricedLine.subtotal
///                                                        │
///                                   Σ subtotal ──► Transaction.total_cents
///                                                        │
///             received - total ──► Transaction.change_cents (never < 0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use qlaris_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies a unit price by a line quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Coffee $10.00
    /// Quantity: 3
    ///      │
    ///      ▼
    /// checked_mul_quantity(3) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Subtotal: Some($30.00), or None if it overflows
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display for logs and error messages ("$10.99", "-$5.50").
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(5000).to_string(), "$50.00");
        assert_eq!(Money::from_cents(7).to_string(), "$0.07");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);

        let mut c = a;
        c += b;
        c -= Money::from_cents(50);
        assert_eq!(c.cents(), 1200);
    }

    #[test]
    fn test_checked_add() {
        let total = [1000, 2500, 1]
            .iter()
            .try_fold(Money::zero(), |acc, c| acc.checked_add(Money::from_cents(*c)));
        assert_eq!(total, Some(Money::from_cents(3501)));

        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn test_change_has_no_drift() {
        // 0.10 + 0.20 repeated many times stays exact
        let mut total = Money::zero();
        for _ in 0..1000 {
            total += Money::from_cents(10) + Money::from_cents(20);
        }
        assert_eq!(total.cents(), 30_000);
        assert!((Money::from_cents(30_000) - total).is_zero());
    }

    #[test]
    fn test_checked_mul_quantity() {
        let price = Money::from_cents(1000);
        assert_eq!(price.checked_mul_quantity(5), Some(Money::from_cents(5000)));
        assert_eq!(price.checked_mul_quantity(0), Some(Money::zero()));

        assert_eq!(Money::from_cents(i64::MAX / 2).checked_mul_quantity(3), None);
    }
}
