//! # smartpos-core: Pure Business Logic for SmartPOS Checkout
//!
//! Money arithmetic, domain types, the pricing calculator and the checkout
//! error taxonomy. No I/O of any kind lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SmartPOS Checkout Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Register UI                                  │   │
//! │  │    Menu ──► Cart ──► Tender ──► Receipt                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CartLine[], Tender[], Context          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               smartpos-checkout                                 │   │
//! │  │    preconditions ──► transaction ──► retry ──► event            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ smartpos-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │ CartLine  │  │   Money   │  │ subtotal  │  │   rules   │  │   │
//! │  │   │  TaxRate  │  │ bps math  │  │ disc, tax │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CartLine, Tender, Order, Product, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Pricing calculator
//! - [`error`] - Validation, pricing and checkout errors
//! - [`validation`] - Field-level rules
//!
//! ## Example Usage
//!
//! ```rust
//! use smartpos_core::{compute_totals, CartLine, Money, TaxRate};
//!
//! let lines = [CartLine::new("nasi-goreng", 2, Money::from_minor(15_000))];
//! let totals = compute_totals(&lines, None, TaxRate::from_bps(1000)).unwrap();
//!
//! assert_eq!(totals.grand_total.minor(), 33_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{
    CheckoutError, CheckoutResult, ErrorCategory, ErrorCode, ErrorResponse, PricingError,
    ValidationError,
};
pub use money::Money;
pub use pricing::{compute_totals, PricingResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single checkout.
///
/// ## Business Reason
/// Keeps one checkout transaction short so other registers are not kept
/// waiting on the queue counter.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches typos such as 1000 instead of 10.
pub const MAX_LINE_QUANTITY: i64 = 999;
