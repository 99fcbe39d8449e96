//! # smartpos-checkout: Checkout Commit Engine
//!
//! Commits a priced cart, its tenders and the matching stock decrements as
//! one SQLite transaction.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Commit Engine                              │
//! │                                                                         │
//! │   Register session(s)                                                   │
//! │        │  lines, tenders, context                                       │
//! │        ▼                                                                │
//! │  ┌──────────────────────┐     ┌─────────────────────────────────────┐  │
//! │  │  CheckoutProcessor   │────►│ smartpos-core::compute_totals       │  │
//! │  │  (checkout.rs)       │     │ (pure, runs before the transaction) │  │
//! │  │                      │     └─────────────────────────────────────┘  │
//! │  │                      │     ┌─────────────────────────────────────┐  │
//! │  │                      │────►│ smartpos-db repositories            │  │
//! │  │                      │     │ queue counter, stock CAS, inserts   │  │
//! │  └──────────┬───────────┘     └─────────────────────────────────────┘  │
//! │             │ after COMMIT                                              │
//! │             ▼                                                           │
//! │  ┌──────────────────────┐                                              │
//! │  │ EventBus (events.rs) │──► catalog / history caches                  │
//! │  └──────────────────────┘                                              │
//! │                                                                         │
//! │  CheckoutConfig (config.rs): tax, tolerance, retries, timeout          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! use smartpos_checkout::{CheckoutConfig, CheckoutProcessor};
//! use smartpos_core::{CartLine, CheckoutContext, Money, PaymentMethod, Tender};
//! use smartpos_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./smartpos.db")).await?;
//! let processor = CheckoutProcessor::new(db, CheckoutConfig::load_or_default(None));
//!
//! let lines = vec![CartLine::new(product_id, 2, Money::from_minor(15_000))];
//! let tenders = vec![Tender::new(PaymentMethod::Cash, Money::from_minor(50_000))];
//!
//! let committed = processor
//!     .commit_checkout(&lines, &tenders, &CheckoutContext::take_away())
//!     .await?;
//! assert_eq!(committed.order.change_minor, 17_000);
//! ```

pub mod checkout;
pub mod config;
pub mod events;

pub use checkout::CheckoutProcessor;
pub use config::{CheckoutConfig, CheckoutSettings, ConfigError, ConfigResult, TaxSettings};
pub use events::{CheckoutEvent, EventBus};
