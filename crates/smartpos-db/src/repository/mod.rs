//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  &self methods (own the pool)         associated fns (borrow a conn)   │
//! │  ────────────────────────────         ──────────────────────────────   │
//! │  db.products().get_by_id(id)          ProductRepository::              │
//! │  db.orders().get_committed(id)            try_decrement_stock(conn,..) │
//! │  db.orders().list_between(a, b)       QueueCounterRepository::         │
//! │                                           reserve_next(conn, date)     │
//! │  Each call is its own implicit         OrderRepository::insert_*(conn) │
//! │  transaction.                                                           │
//! │                                        The caller owns the transaction │
//! │                                        and passes `&mut *tx`.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog rows and stock
//! - [`OrderRepository`](order::OrderRepository) - Order header, lines, payments
//! - [`QueueCounterRepository`](queue::QueueCounterRepository) - Per-day queue numbers

pub mod order;
pub mod product;
pub mod queue;
