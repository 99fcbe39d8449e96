//! # Pricing Calculator
//!
//! Turns cart lines, an optional discount and the active tax rate into the
//! authoritative totals of an order. Pure: no I/O, no clock, no randomness.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal      = Σ unit_price × quantity        (exact, no rounding)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  discount      = PERCENTAGE: round(subtotal × bps / 10000)              │
//! │                  FIXED:      amount                                     │
//! │                  then min(discount, subtotal)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  taxable base  = subtotal − discount                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tax           = round(taxable base × rate_bps / 10000)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  grand total   = taxable base + tax                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax is always charged on the discounted amount, never on the raw subtotal.
//!
//! ## Example
//! ```rust
//! use smartpos_core::money::Money;
//! use smartpos_core::pricing::compute_totals;
//! use smartpos_core::types::{CartLine, Discount, TaxRate};
//!
//! let lines = vec![CartLine::new("kopi-susu", 2, Money::from_minor(15_000))];
//! let totals = compute_totals(&lines, Some(&Discount::percent(10)), TaxRate::from_bps(1000)).unwrap();
//!
//! assert_eq!(totals.discount_amount.minor(), 3_000);
//! assert_eq!(totals.tax_amount.minor(), 2_700);
//! assert_eq!(totals.grand_total.minor(), 29_700);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::PricingError;
use crate::money::Money;
use crate::types::{CartLine, ClientSummary, Discount, TaxRate};

/// Authoritative totals for one checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingResult {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub taxable_base: Money,
    pub tax_amount: Money,
    pub grand_total: Money,
}

impl PricingResult {
    /// Checks whether a register-side summary agrees with these totals.
    pub fn matches(&self, summary: &ClientSummary) -> bool {
        self.subtotal == summary.subtotal
            && self.discount_amount == summary.discount
            && self.tax_amount == summary.tax
            && self.grand_total == summary.grand_total
    }
}

/// Computes subtotal, discount, taxable base, tax and grand total.
///
/// ## Errors
/// - [`PricingError::InvalidInput`] when a line has `quantity <= 0`, a
///   negative unit price, or the sums overflow `i64`
/// - [`PricingError::InvalidDiscount`] for a negative fixed discount
///
/// An empty slice is not an error here; it prices to zero.
pub fn compute_totals(
    lines: &[CartLine],
    discount: Option<&Discount>,
    tax_rate: TaxRate,
) -> Result<PricingResult, PricingError> {
    let mut subtotal = Money::zero();

    for (index, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(PricingError::InvalidInput {
                line: index,
                reason: format!("quantity must be positive, got {}", line.quantity),
            });
        }
        if line.unit_price.is_negative() {
            return Err(PricingError::InvalidInput {
                line: index,
                reason: format!("price must not be negative, got {}", line.unit_price.minor()),
            });
        }

        let line_total = line
            .unit_price
            .checked_multiply_quantity(line.quantity)
            .and_then(|t| subtotal.checked_add(t))
            .ok_or_else(|| PricingError::InvalidInput {
                line: index,
                reason: "amount too large".to_string(),
            })?;
        subtotal = line_total;
    }

    let discount_amount = match discount {
        None => Money::zero(),
        Some(Discount::Percentage { bps }) => subtotal.apply_bps(*bps),
        Some(Discount::Fixed { amount }) => {
            if amount.is_negative() {
                return Err(PricingError::InvalidDiscount {
                    reason: format!("fixed amount must not be negative, got {}", amount.minor()),
                });
            }
            *amount
        }
    }
    .min(subtotal);

    // discount_amount is clamped to [0, subtotal], so this cannot go negative
    let taxable_base = subtotal - discount_amount;
    let tax_amount = taxable_base.calculate_tax(tax_rate);

    // reported against the last line
    let grand_total = taxable_base
        .checked_add(tax_amount)
        .ok_or_else(|| PricingError::InvalidInput {
            line: lines.len().saturating_sub(1),
            reason: "grand total too large".to_string(),
        })?;

    Ok(PricingResult {
        subtotal,
        discount_amount,
        taxable_base,
        tax_amount,
        grand_total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
