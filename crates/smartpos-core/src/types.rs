//! # Domain Types
//!
//! Core domain types used throughout the checkout engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  INPUT (ephemeral)                                                      │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartLine     │   │     Tender      │   │ CheckoutContext │       │
//! │  │  product_id     │   │  method         │   │  order_type     │       │
//! │  │  quantity       │   │  amount         │   │  table_number   │       │
//! │  │  unit_price     │   │  reference_id   │   │  discount, ...  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  PERSISTED (immutable after commit)                                     │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │──►│   OrderLine     │   │  OrderPayment   │       │
//! │  │  queue_number   │   │  *_snapshot     │   │  method         │       │
//! │  │  totals         │──►│  price_at_time  │   │  amount_minor   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  EXTERNALLY OWNED                                                       │
//! │  ┌─────────────────┐                                                    │
//! │  │    Product      │  stock is decremented only inside a checkout      │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Order lines copy the product's name, SKU and cost at commit time. Editing
//! or deleting the product afterwards never changes a past order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::pricing::PricingResult;

/// Table number stored on orders that are not eaten in.
pub const TAKE_AWAY_TABLE: &str = "TAKE AWAY";

/// Customer name stored when the cashier leaves the field blank.
pub const DEFAULT_CUSTOMER_NAME: &str = "Guest";

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (a typical restaurant service tax)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Parses a decimal percentage string such as `"10"` or `"11.5"`.
    ///
    /// At most two decimal places are accepted so the result is exact in
    /// basis points. No float is involved.
    ///
    /// ## Example
    /// ```rust
    /// use smartpos_core::types::TaxRate;
    ///
    /// assert_eq!(TaxRate::parse_percent("10").unwrap().bps(), 1000);
    /// assert_eq!(TaxRate::parse_percent("11.5").unwrap().bps(), 1150);
    /// assert!(TaxRate::parse_percent("abc").is_none());
    /// ```
    pub fn parse_percent(input: &str) -> Option<Self> {
        let input = input.trim().trim_end_matches('%');
        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole: u32 = whole.parse().ok()?;
        let frac_bps: u32 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u32>().ok()? * 10,
            _ => frac.parse().ok()?,
        };
        whole.checked_mul(100)?.checked_add(frac_bps).map(TaxRate)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// The single tax in force for a register: display name plus rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActiveTax {
    pub name: String,
    pub rate: TaxRate,
}

impl ActiveTax {
    pub fn new(name: impl Into<String>, rate: TaxRate) -> Self {
        Self {
            name: name.into(),
            rate,
        }
    }
}

// =============================================================================
// Order Type
// =============================================================================

/// Where the customer eats. Dine-in orders must carry a table number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    DineIn,
    TakeAway,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a single tender was paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Debit card on the EDC terminal.
    Debit,
    /// QR payment (QRIS).
    Qris,
}

/// Payment method label stored on the order header.
///
/// Identical to the tender's method when there is exactly one tender,
/// otherwise [`PaymentLabel::Split`].
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentLabel {
    Cash,
    Debit,
    Qris,
    Split,
}

impl PaymentLabel {
    /// Derives the header label from the tenders of one checkout.
    ///
    /// Returns `None` for an empty slice.
    pub fn for_tenders(tenders: &[Tender]) -> Option<Self> {
        match tenders {
            [] => None,
            [only] => Some(only.method.into()),
            _ => Some(PaymentLabel::Split),
        }
    }
}

impl From<PaymentMethod> for PaymentLabel {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => PaymentLabel::Cash,
            PaymentMethod::Debit => PaymentLabel::Debit,
            PaymentMethod::Qris => PaymentLabel::Qris,
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// An already-validated discount supplied by the caller.
///
/// Serialized with a `type` tag:
/// `{"type":"PERCENTAGE","bps":1000}` or `{"type":"FIXED","amount":5000}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Discount {
    /// Percentage of the subtotal, in basis points (1000 = 10%).
    Percentage { bps: u32 },
    /// Fixed amount off the subtotal.
    Fixed { amount: Money },
}

impl Discount {
    /// Convenience constructor for a whole-number percentage.
    pub const fn percent(pct: u32) -> Self {
        Discount::Percentage { bps: pct * 100 }
    }

    pub const fn fixed(amount: Money) -> Self {
        Discount::Fixed { amount }
    }
}

/// A discount plus the identifier of the record it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedDiscount {
    pub id: String,
    pub discount: Discount,
}

// =============================================================================
// Checkout Input
// =============================================================================

/// One cart line as submitted by the register.
///
/// `unit_price` is the price the customer was shown; pricing uses it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }
}

/// One payment instrument offered by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tender {
    pub method: PaymentMethod,
    pub amount: Money,
    /// Approval code, card last-4, QR reference, etc.
    pub reference_id: Option<String>,
}

impl Tender {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        Self {
            method,
            amount,
            reference_id: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_id = Some(reference.into());
        self
    }
}

/// Totals the register computed locally. Compared, logged, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientSummary {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub grand_total: Money,
}

/// Everything about a checkout that is not a cart line or a tender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutContext {
    pub order_type: OrderType,
    pub table_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub member_id: Option<String>,
    pub discount: Option<ResolvedDiscount>,
    pub cashier_id: Option<String>,
    pub client_summary: Option<ClientSummary>,
}

impl CheckoutContext {
    fn with_order_type(order_type: OrderType, table_number: Option<String>) -> Self {
        Self {
            order_type,
            table_number,
            customer_name: None,
            customer_phone: None,
            member_id: None,
            discount: None,
            cashier_id: None,
            client_summary: None,
        }
    }

    /// A take-away checkout.
    pub fn take_away() -> Self {
        Self::with_order_type(OrderType::TakeAway, None)
    }

    /// A dine-in checkout at the given table.
    pub fn dine_in(table_number: impl Into<String>) -> Self {
        Self::with_order_type(OrderType::DineIn, Some(table_number.into()))
    }

    pub fn with_customer(mut self, name: impl Into<String>, phone: Option<String>) -> Self {
        self.customer_name = Some(name.into());
        self.customer_phone = phone;
        self
    }

    pub fn with_member(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    pub fn with_discount(mut self, id: impl Into<String>, discount: Discount) -> Self {
        self.discount = Some(ResolvedDiscount {
            id: id.into(),
            discount,
        });
        self
    }

    pub fn with_cashier(mut self, cashier_id: impl Into<String>) -> Self {
        self.cashier_id = Some(cashier_id.into());
        self
    }

    pub fn with_client_summary(mut self, summary: ClientSummary) -> Self {
        self.client_summary = Some(summary);
        self
    }

    /// Table number as it will be stored: trimmed for dine-in,
    /// [`TAKE_AWAY_TABLE`] otherwise. `None` when dine-in has no table.
    pub fn resolved_table_number(&self) -> Option<String> {
        match self.order_type {
            OrderType::TakeAway => Some(TAKE_AWAY_TABLE.to_string()),
            OrderType::DineIn => self
                .table_number
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }

    /// Customer name as it will be stored.
    pub fn resolved_customer_name(&self) -> String {
        self.customer_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_CUSTOMER_NAME)
            .to_string()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Owned by catalog management; checkout only reads it
/// and decrements `stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit, optional for made-to-order items.
    pub sku: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Menu price in minor units.
    pub price_minor: i64,

    /// Cost in minor units (for margin reports).
    pub cost_price_minor: i64,

    /// Units on hand, never negative.
    pub stock: i64,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Builds a new active product with a fresh id.
    pub fn new(name: impl Into<String>, price: Money, stock: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sku: None,
            name: name.into(),
            price_minor: price.minor(),
            cost_price_minor: 0,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_cost(mut self, cost: Money) -> Self {
        self.cost_price_minor = cost.minor();
        self
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price_minor)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_minor(self.cost_price_minor)
    }

    /// Checks if `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Order
// =============================================================================

/// A committed order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Local calendar day the queue number belongs to.
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub queue_number: i64,
    pub order_type: OrderType,
    /// Table number, or [`TAKE_AWAY_TABLE`].
    pub table_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub member_id: Option<String>,
    pub discount_id: Option<String>,
    pub cashier_id: Option<String>,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub tax_minor: i64,
    pub total_minor: i64,
    pub tax_name_snapshot: String,
    pub tax_rate_bps_snapshot: u32,
    pub payment_method: PaymentLabel,
    pub amount_tendered_minor: i64,
    pub change_minor: i64,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_minor(self.subtotal_minor)
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_minor(self.total_minor)
    }

    #[inline]
    pub fn amount_tendered(&self) -> Money {
        Money::from_minor(self.amount_tendered_minor)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_minor(self.change_minor)
    }

    /// Rebuilds the pricing breakdown stored on this header.
    pub fn pricing(&self) -> PricingResult {
        let subtotal = Money::from_minor(self.subtotal_minor);
        let discount_amount = Money::from_minor(self.discount_minor);
        PricingResult {
            subtotal,
            discount_amount,
            taxable_base: subtotal - discount_amount,
            tax_amount: Money::from_minor(self.tax_minor),
            grand_total: Money::from_minor(self.total_minor),
        }
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// A line of a committed order.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<String>,
    /// Product name at time of sale (frozen).
    pub product_name_snapshot: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: Option<String>,
    /// Unit cost at time of sale (frozen).
    pub cost_price_minor_snapshot: i64,
    pub quantity: i64,
    /// Unit price charged.
    pub price_at_time_minor: i64,
    /// `price_at_time_minor × quantity`.
    pub line_total_minor: i64,
    /// Zero-based cart position.
    pub position: i64,
}

impl OrderLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_minor(self.price_at_time_minor)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_minor(self.line_total_minor)
    }
}

// =============================================================================
// Order Payment
// =============================================================================

/// One tender of a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderPayment {
    pub id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount_minor: i64,
    pub reference_id: Option<String>,
    pub position: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_minor(self.amount_minor)
    }
}

/// Header, lines and payments of one order. What receipts and history read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommittedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub payments: Vec<OrderPayment>,
}

impl CommittedOrder {
    /// Sum of all payment rows.
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(OrderPayment::amount).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_parse_percent() {
        assert_eq!(TaxRate::parse_percent("10"), Some(TaxRate::from_bps(1000)));
        assert_eq!(TaxRate::parse_percent(" 11.5 "), Some(TaxRate::from_bps(1150)));
        assert_eq!(TaxRate::parse_percent("8.25"), Some(TaxRate::from_bps(825)));
        assert_eq!(TaxRate::parse_percent("0"), Some(TaxRate::zero()));
        assert_eq!(TaxRate::parse_percent("10%"), Some(TaxRate::from_bps(1000)));

        assert_eq!(TaxRate::parse_percent(""), None);
        assert_eq!(TaxRate::parse_percent("1.234"), None);
        assert_eq!(TaxRate::parse_percent("-5"), None);
        assert_eq!(TaxRate::parse_percent(".5"), None);
        assert_eq!(TaxRate::parse_percent("ten"), None);
    }

    #[test]
    fn test_payment_label_for_tenders() {
        let cash = Tender::new(PaymentMethod::Cash, Money::from_minor(20_000));
        let qris = Tender::new(PaymentMethod::Qris, Money::from_minor(13_000));

        assert_eq!(PaymentLabel::for_tenders(&[]), None);
        assert_eq!(
            PaymentLabel::for_tenders(std::slice::from_ref(&qris)),
            Some(PaymentLabel::Qris)
        );
        assert_eq!(
            PaymentLabel::for_tenders(&[cash, qris]),
            Some(PaymentLabel::Split)
        );
    }

    #[test]
    fn test_discount_serde_shape() {
        let json = serde_json::to_string(&Discount::percent(10)).unwrap();
        assert_eq!(json, r#"{"type":"PERCENTAGE","bps":1000}"#);

        let fixed: Discount = serde_json::from_str(r#"{"type":"FIXED","amount":5000}"#).unwrap();
        assert_eq!(fixed, Discount::fixed(Money::from_minor(5000)));
    }

    #[test]
    fn test_order_type_serde() {
        assert_eq!(serde_json::to_string(&OrderType::DineIn).unwrap(), r#""dine_in""#);
        assert_eq!(serde_json::to_string(&PaymentLabel::Split).unwrap(), r#""split""#);
    }

    #[test]
    fn test_resolved_table_number() {
        assert_eq!(
            CheckoutContext::take_away().resolved_table_number().as_deref(),
            Some(TAKE_AWAY_TABLE)
        );
        assert_eq!(
            CheckoutContext::dine_in(" 7 ").resolved_table_number().as_deref(),
            Some("7")
        );
        assert_eq!(CheckoutContext::dine_in("   ").resolved_table_number(), None);

        let mut missing = CheckoutContext::dine_in("1");
        missing.table_number = None;
        assert_eq!(missing.resolved_table_number(), None);
    }

    #[test]
    fn test_take_away_ignores_supplied_table() {
        let mut ctx = CheckoutContext::take_away();
        ctx.table_number = Some("12".to_string());
        assert_eq!(ctx.resolved_table_number().as_deref(), Some(TAKE_AWAY_TABLE));
    }

    #[test]
    fn test_resolved_customer_name_defaults_to_guest() {
        assert_eq!(CheckoutContext::take_away().resolved_customer_name(), "Guest");
        assert_eq!(
            CheckoutContext::take_away()
                .with_customer("  ", None)
                .resolved_customer_name(),
            "Guest"
        );
        assert_eq!(
            CheckoutContext::take_away()
                .with_customer("Budi", Some("0812".into()))
                .resolved_customer_name(),
            "Budi"
        );
    }

    #[test]
    fn test_product_can_sell() {
        let p = Product::new("Es Teh", Money::from_minor(5_000), 3, Utc::now());
        assert!(p.can_sell(3));
        assert!(!p.can_sell(4));
        assert!(p.is_active);
        assert_eq!(p.price().minor(), 5_000);
    }
}
