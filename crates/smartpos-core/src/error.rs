//! # Error Types
//!
//! Domain-specific error types for the checkout engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  smartpos-core errors (this file)                                      │
//! │  ├── ValidationError  - Field-level input validation                   │
//! │  ├── PricingError     - Malformed cart line handed to the calculator   │
//! │  └── CheckoutError    - The only failure a checkout can return         │
//! │                                                                         │
//! │  smartpos-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError ─┐                                              │
//! │        PricingError ────┼──► CheckoutError ──► ErrorResponse ──► UI    │
//! │        DbError ─────────┘                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Categories
//! | Category       | Variants                                              | Retried |
//! |----------------|-------------------------------------------------------|---------|
//! | Input          | EmptyCart, NoPayment, TableNumberRequired,            | never   |
//! |                | InsufficientPayment, InvalidInput, InvalidTender      |         |
//! | DomainState    | ProductNotFound, InsufficientStock                    | never   |
//! | Concurrency    | ConcurrentQueueConflict                               | engine  |
//! | Infrastructure | PersistenceFailure                                    | caller  |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Rejection from [`crate::pricing::compute_totals`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// A cart line has a non-positive quantity, a negative price, or totals
    /// that do not fit in an i64.
    #[error("Invalid cart line {line}: {reason}")]
    InvalidInput { line: usize, reason: String },

    /// A fixed discount with a negative amount.
    #[error("Invalid discount: {reason}")]
    InvalidDiscount { reason: String },
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Every way a checkout can fail.
///
/// Whatever the variant, nothing was written: the order, its lines, its
/// payments and all stock decrements are committed together or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// No cart lines were submitted.
    #[error("Cart is empty")]
    EmptyCart,

    /// No tenders were submitted.
    #[error("No payment was provided")]
    NoPayment,

    /// Dine-in order without a (non-blank) table number.
    #[error("Table number is required for dine-in orders")]
    TableNumberRequired,

    /// Tendered total does not cover the grand total.
    ///
    /// ## User Workflow
    /// ```text
    /// Grand total 33.000, customer hands over 30.000
    ///      │
    ///      ▼
    /// InsufficientPayment { required: 33000, tendered: 30000 }
    ///      │
    ///      ▼
    /// UI shows: "Payment short by Rp 3.000"
    /// ```
    #[error("Insufficient payment: required {required}, tendered {tendered}")]
    InsufficientPayment { required: Money, tendered: Money },

    /// A cart line is malformed (quantity, price, size limits).
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A tender is malformed (negative amount, oversized reference).
    #[error("Invalid tender {index}: {reason}")]
    InvalidTender { index: usize, reason: String },

    /// The product no longer exists in the catalog.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Live stock is lower than the requested quantity.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Queue number reservation lost every retry to concurrent checkouts.
    #[error("Queue number for {business_date} is contended after {attempts} attempts")]
    ConcurrentQueueConflict {
        business_date: NaiveDate,
        attempts: u32,
    },

    /// Storage failed or timed out. Nothing was committed.
    #[error("Persistence failure: {reason}")]
    PersistenceFailure { reason: String },
}

/// Coarse grouping of [`CheckoutError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rejected before any transaction opened. Caller must fix the input.
    Input,
    /// Detected against live data inside the transaction.
    DomainState,
    /// Lost a race for a shared counter.
    Concurrency,
    /// Storage unavailable or failing.
    Infrastructure,
}

/// Machine-readable error codes for the register UI.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (e.code) {
///   case 'INSUFFICIENT_STOCK':
///     highlightLine(e.message);
///     break;
///   case 'PERSISTENCE_FAILURE':
///     offerRetry();
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    EmptyCart,
    NoPayment,
    TableNumberRequired,
    InsufficientPayment,
    InvalidInput,
    InvalidTender,
    ProductNotFound,
    InsufficientStock,
    ConcurrentQueueConflict,
    PersistenceFailure,
}

/// What the UI receives when a checkout fails.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Only 2 left in stock", "retryable": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl CheckoutError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CheckoutError::EmptyCart => ErrorCode::EmptyCart,
            CheckoutError::NoPayment => ErrorCode::NoPayment,
            CheckoutError::TableNumberRequired => ErrorCode::TableNumberRequired,
            CheckoutError::InsufficientPayment { .. } => ErrorCode::InsufficientPayment,
            CheckoutError::InvalidInput { .. } => ErrorCode::InvalidInput,
            CheckoutError::InvalidTender { .. } => ErrorCode::InvalidTender,
            CheckoutError::ProductNotFound { .. } => ErrorCode::ProductNotFound,
            CheckoutError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CheckoutError::ConcurrentQueueConflict { .. } => ErrorCode::ConcurrentQueueConflict,
            CheckoutError::PersistenceFailure { .. } => ErrorCode::PersistenceFailure,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CheckoutError::EmptyCart
            | CheckoutError::NoPayment
            | CheckoutError::TableNumberRequired
            | CheckoutError::InsufficientPayment { .. }
            | CheckoutError::InvalidInput { .. }
            | CheckoutError::InvalidTender { .. } => ErrorCategory::Input,
            CheckoutError::ProductNotFound { .. } | CheckoutError::InsufficientStock { .. } => {
                ErrorCategory::DomainState
            }
            CheckoutError::ConcurrentQueueConflict { .. } => ErrorCategory::Concurrency,
            CheckoutError::PersistenceFailure { .. } => ErrorCategory::Infrastructure,
        }
    }

    /// True when resubmitting the same checkout may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Concurrency | ErrorCategory::Infrastructure
        )
    }

    /// A message safe to show the cashier.
    ///
    /// Infrastructure details never leak; domain errors keep the numbers the
    /// cashier needs to fix the cart.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::EmptyCart => "Add at least one item before checking out".to_string(),
            CheckoutError::NoPayment => "Add a payment before checking out".to_string(),
            CheckoutError::TableNumberRequired => "Enter a table number for dine-in".to_string(),
            CheckoutError::InsufficientPayment { required, tendered } => {
                format!("Payment short by {}", *required - *tendered)
            }
            CheckoutError::InvalidInput { reason } => format!("Invalid cart: {}", reason),
            CheckoutError::InvalidTender { reason, .. } => format!("Invalid payment: {}", reason),
            CheckoutError::ProductNotFound { .. } => {
                "A product in the cart is no longer available".to_string()
            }
            CheckoutError::InsufficientStock { available, .. } => {
                format!("Only {} left in stock", available)
            }
            CheckoutError::ConcurrentQueueConflict { .. } => {
                "The register is busy, please try again".to_string()
            }
            CheckoutError::PersistenceFailure { .. } => {
                "Could not save the order, please try again".to_string()
            }
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.user_message(),
            retryable: self.is_retryable(),
        }
    }
}

impl From<PricingError> for CheckoutError {
    fn from(err: PricingError) -> Self {
        CheckoutError::InvalidInput {
            reason: err.to_string(),
        }
    }
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::InvalidInput {
            reason: err.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CheckoutError.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================
