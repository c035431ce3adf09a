//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE STOCK VALUATION PROBLEM                                            │
//! │                                                                         │
//! │  With floating point:                                                   │
//! │    total_cost += 0.1 (×10 purchases) = 0.9999999999999999  ❌           │
//! │                                                                         │
//! │  Stock rows are touched by every purchase, use, sale and return.       │
//! │  Rounding drift would accumulate in total_cost forever.                │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (paisa / cents)                     │
//! │    total_cost is exact; only the average unit cost is rounded,         │
//! │    and it is always re-derived from total_cost / quantity.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cable_core::money::Money;
//!
//! let price = Money::from_cents(10_050); // 100.50
//! let line = price.multiply_quantity(4);  // 402.00
//! assert_eq!(line.cents(), 40_200);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: outflows in the cash and bank books are negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use cable_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use cable_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
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

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a quantity, saturating at the `i64`
    /// bounds so an oversized line fails validation instead of wrapping.
    ///
    /// ## Example
    /// ```rust
    /// use cable_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Average unit value of `self` spread over `qty` units, rounded half up.
    ///
    /// Returns `None` for a zero quantity.
    ///
    /// ## Example
    /// ```rust
    /// use cable_core::money::Money;
    ///
    /// // 1000 over 3 units = 333.33 → 333
    /// assert_eq!(Money::from_cents(1000).average_over(3), Some(Money::from_cents(333)));
    /// // 1000 over 6 units = 166.67 → 167
    /// assert_eq!(Money::from_cents(1000).average_over(6), Some(Money::from_cents(167)));
    /// assert_eq!(Money::from_cents(1000).average_over(0), None);
    /// ```
    pub fn average_over(&self, qty: i64) -> Option<Money> {
        if qty == 0 {
            return None;
        }
        // i128 keeps large totals from overflowing the doubled numerator
        let num = 2 * self.0 as i128 + qty as i128;
        let den = 2 * qty as i128;
        Some(Money(num.div_euclid(den) as i64))
    }

    /// Share of `self` attributable to `part` out of `whole` units, rounded half up.
    ///
    /// Taking the whole returns `self` exactly, so an emptied stock row
    /// carries no residual cost.
    ///
    /// ## Example
    /// ```rust
    /// use cable_core::money::Money;
    ///
    /// let total = Money::from_cents(1000);
    /// assert_eq!(total.proportion(1, 3).cents(), 333);
    /// assert_eq!(total.proportion(3, 3).cents(), 1000);
    /// ```
    pub fn proportion(&self, part: i64, whole: i64) -> Money {
        if whole == 0 || part == whole {
            return *self;
        }
        let num = 2 * self.0 as i128 * part as i128 + whole as i128;
        let den = 2 * whole as i128;
        Money(num.div_euclid(den) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `major.minor` without a currency symbol.
///
/// ## Note
/// The CLI prefixes its configured currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| Money(acc.0.saturating_add(m.0)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
