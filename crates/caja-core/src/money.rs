//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, and the
//! discount arithmetic used when finalizing a sale.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many retail systems:                                                │
//! │    $10.00 / 3 = $3.33 (×3 = $9.99)  → Lost $0.01!                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    1000 cents / 3 = 333 cents (×3 = 999 cents)                         │
//! │    We KNOW we lost 1 cent, and handle it explicitly                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // $10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;                     // $21.98
//! let total = price + Money::from_cents(500);  // $15.99
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::DiscountType;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Saturating subtraction that never goes below zero.
    ///
    /// Used for "floored at zero" rules: a fixed discount larger than the
    /// total yields a zero final total, not a negative one.
    #[inline]
    pub const fn saturating_sub_to_zero(self, other: Money) -> Money {
        let diff = self.0 - other.0;
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl fmt::Display for Money {
    /// Formats as dollars and cents, e.g. `$10.99` or `-$3.50`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0 * rhs)
    }
}

// =============================================================================
// Discounts
// =============================================================================

/// Computes the amount a discount takes off a total.
///
/// ## Semantics
/// - `Fixed`: `value` is in cents, capped at the total (no negative totals)
/// - `Percentage`: `value` is a whole percent (0-100); integer division
///   truncates toward zero, so 15% of 10,001 cents is 1,500 cents
pub fn discount_amount(total: Money, value: i64, kind: DiscountType) -> Money {
    match kind {
        DiscountType::Fixed => Money::from_cents(value.min(total.cents()).max(0)),
        DiscountType::Percentage => {
            let pct = value.clamp(0, 100);
            Money::from_cents(total.cents() * pct / 100)
        }
    }
}

/// Applies a discount to a total, flooring the result at zero.
///
/// ## Example
/// ```rust
/// use caja_core::money::{apply_discount, Money};
/// use caja_core::types::DiscountType;
///
/// let total = Money::from_cents(10_000);
/// assert_eq!(apply_discount(total, 15, DiscountType::Percentage).cents(), 8_500);
/// assert_eq!(apply_discount(total, 12_000, DiscountType::Fixed).cents(), 0);
/// ```
pub fn apply_discount(total: Money, value: i64, kind: DiscountType) -> Money {
    total.saturating_sub_to_zero(discount_amount(total, value, kind))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1099);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1599);
        assert_eq!((a - b).cents(), 599);
        assert_eq!((a * 3).cents(), 3297);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-350).to_string(), "-$3.50");
    }

    #[test]
    fn test_percentage_discount() {
        let total = Money::from_cents(10_000);
        assert_eq!(apply_discount(total, 15, DiscountType::Percentage).cents(), 8_500);
        assert_eq!(apply_discount(total, 0, DiscountType::Percentage).cents(), 10_000);
        assert_eq!(apply_discount(total, 100, DiscountType::Percentage).cents(), 0);
    }

    #[test]
    fn test_fixed_discount_floors_at_zero() {
        let total = Money::from_cents(10_000);
        assert_eq!(apply_discount(total, 2_000, DiscountType::Fixed).cents(), 8_000);
        // Over-large fixed discount never produces a negative total
        assert_eq!(apply_discount(total, 12_000, DiscountType::Fixed).cents(), 0);
    }

    #[test]
    fn test_discount_is_idempotent_on_inputs() {
        // Same inputs always produce the same output (pure function)
        let total = Money::from_cents(10_000);
        let first = apply_discount(total, 15, DiscountType::Percentage);
        let second = apply_discount(total, 15, DiscountType::Percentage);
        assert_eq!(first, second);
    }

    #[test]
    fn test_negative_discount_value_is_ignored() {
        let total = Money::from_cents(10_000);
        assert_eq!(apply_discount(total, -50, DiscountType::Fixed).cents(), 10_000);
        assert_eq!(apply_discount(total, -50, DiscountType::Percentage).cents(), 10_000);
    }
}
