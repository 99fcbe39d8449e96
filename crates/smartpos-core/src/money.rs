//! # Money
//!
//! `Money` is an `i64` count of the smallest currency unit (Rupiah has no
//! fractional unit in practice, so 15.000 is stored as `15000`). Nothing in
//! the checkout path touches floats.
//!
//! Rounding happens in two places only, both half-up on basis points:
//!
//! ```text
//!   discount = subtotal  × bps / 10000   (percent discounts)
//!   tax      = taxable   × bps / 10000   (after discount)
//! ```
//!
//! Totals computed on the register and the totals read back from SQLite
//! are therefore bit-for-bit the same numbers.
//!
//! ```rust
//! use smartpos_core::money::Money;
//!
//! let price = Money::from_minor(15_000);
//! assert_eq!(price.multiply_quantity(2).minor(), 30_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Basis-point denominator (10000 bps = 100%).
const BPS_DENOMINATOR: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction never panics on intermediate values,
///   validators reject negatives at the boundary instead
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Newtype serde**: serializes as a bare integer
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CartLine.unit_price ──► line total ──► subtotal                        │
/// │                                            │                            │
/// │                         discount ◄─────────┤                            │
/// │                                            ▼                            │
/// │                         taxable base ──► tax ──► grand total            │
/// │                                                     │                   │
/// │  Tender.amount ──► amount tendered ──► change ◄─────┘                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use smartpos_core::money::Money;
    ///
    /// let price = Money::from_minor(15_000);
    /// assert_eq!(price.minor(), 15_000);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a basis-point rate with half-up rounding.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5). Callers only pass
    /// non-negative amounts, so this is round-half-up.
    ///
    /// ## Example
    /// ```rust
    /// use smartpos_core::money::Money;
    ///
    /// // 10% of 30000
    /// assert_eq!(Money::from_minor(30_000).apply_bps(1_000).minor(), 3_000);
    /// // 8.25% of 1000 = 82.5 → 83
    /// assert_eq!(Money::from_minor(1_000).apply_bps(825).minor(), 83);
    /// ```
    pub fn apply_bps(&self, bps: u32) -> Money {
        // i128 keeps large subtotals from overflowing before the division
        let scaled = (self.0 as i128 * bps as i128 + BPS_DENOMINATOR / 2) / BPS_DENOMINATOR;
        Money(scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Calculates tax on this amount.
    ///
    /// ## Example
    /// ```rust
    /// use smartpos_core::money::Money;
    /// use smartpos_core::types::TaxRate;
    ///
    /// let base = Money::from_minor(27_000);
    /// let tax = base.calculate_tax(TaxRate::from_bps(1_000));
    /// assert_eq!(tax.minor(), 2_700);
    /// ```
    #[inline]
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.apply_bps(rate.bps())
    }

    /// Multiplies money by a quantity, `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use smartpos_core::money::Money;
    ///
    /// let line_total = Money::from_minor(15_000).multiply_quantity(2);
    /// assert_eq!(line_total.minor(), 30_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Returns `self - other`, floored at zero.
    ///
    /// Used for change: a customer is never owed negative change.
    #[inline]
    pub fn saturating_sub_zero(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Groups thousands with a dot, the way register receipts print amounts.
///
/// ## Note
/// This is for logs and debugging. The UI does its own localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp {}", sign, grouped)
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(15_000);
        assert_eq!(money.minor(), 15_000);
        assert!(!money.is_zero());
        assert!(Money::zero().is_zero());
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_minor(33_000).to_string(), "Rp 33.000");
        assert_eq!(Money::from_minor(1_250_500).to_string(), "Rp 1.250.500");
        assert_eq!(Money::from_minor(999).to_string(), "Rp 999");
        assert_eq!(Money::from_minor(0).to_string(), "Rp 0");
        assert_eq!(Money::from_minor(-4_500).to_string(), "-Rp 4.500");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);

        let mut c = a;
        c += b;
        c -= Money::from_minor(200);
        assert_eq!(c.minor(), 1300);
    }

    #[test]
    fn test_sum() {
        let total: Money = [10_000, 20_000, 3_000]
            .into_iter()
            .map(Money::from_minor)
            .sum();
        assert_eq!(total.minor(), 33_000);
    }

    #[test]
    fn test_tax_calculation_basic() {
        let tax = Money::from_minor(30_000).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.minor(), 3_000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 1000 × 8.25% = 82.5 → 83
        assert_eq!(Money::from_minor(1000).apply_bps(825).minor(), 83);
        // 1001 × 11% = 110.11 → 110
        assert_eq!(Money::from_minor(1001).apply_bps(1100).minor(), 110);
        // 5 × 10% = 0.5 → 1
        assert_eq!(Money::from_minor(5).apply_bps(1000).minor(), 1);
    }

    #[test]
    fn test_apply_bps_large_amount_does_not_overflow() {
        let big = Money::from_minor(i64::MAX / 2);
        let ten_pct = big.apply_bps(1000);
        assert!(ten_pct.minor() > 0);
    }

    #[test]
    fn test_checked_helpers() {
        assert_eq!(
            Money::from_minor(15_000).checked_multiply_quantity(2),
            Some(Money::from_minor(30_000))
        );
        assert_eq!(Money::from_minor(i64::MAX).checked_multiply_quantity(2), None);
        assert_eq!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)), None);
    }

    #[test]
    fn test_saturating_sub_zero() {
        let paid = Money::from_minor(50_000);
        let due = Money::from_minor(33_000);
        assert_eq!(paid.saturating_sub_zero(due).minor(), 17_000);
        assert_eq!(due.saturating_sub_zero(paid).minor(), 0);
    }

    #[test]
    fn test_serializes_as_bare_integer() {
        let json = serde_json::to_string(&Money::from_minor(33_000)).unwrap();
        assert_eq!(json, "33000");
        let back: Money = serde_json::from_str("17000").unwrap();
        assert_eq!(back.minor(), 17_000);
    }
}
