//! # Checkout Transaction Processor
//!
//! Turns a cart and its tenders into a committed order, atomically.
//!
//! ## Commit Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       commit_checkout()                                 │
//! │                                                                         │
//! │  1. Preconditions (no I/O)                                             │
//! │     EmptyCart → NoPayment → TableNumberRequired → line/tender checks   │
//! │     → compute_totals() → InsufficientPayment                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  2. One SQLite transaction                                             │
//! │     ┌───────────────────────────────────────────────────────────────┐  │
//! │     │ a. reserve queue number   (first write: takes the lock)       │  │
//! │     │ b. per line: re-read product, guarded stock decrement         │  │
//! │     │ c. insert order header                                        │  │
//! │     │ d. insert line snapshots                                      │  │
//! │     │ e. insert payments        (a-e bounded by commit_timeout)     │  │
//! │     ├───────────────────────────────────────────────────────────────┤  │
//! │     │ f. COMMIT                 (not timed)                         │  │
//! │     └───────────────────────────────────────────────────────────────┘  │
//! │     Any error, timeout or cancellation → transaction dropped →         │
//! │     ROLLBACK, nothing visible.                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  3. Post-commit: publish OrderCommitted (best effort)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Policy
//! Only lock contention and a queue-number collision are retried, with
//! jittered exponential backoff, up to `max_retries` times after the first
//! attempt. Everything else is returned to the caller on the first occurrence.
//!
//! ## Timeouts and Resubmission
//! The timeout stops at the COMMIT statement, so a timed-out attempt has
//! always been rolled back and resubmitting it cannot duplicate an order.
//! A caller that drops the future while COMMIT is in flight cannot tell
//! whether the order landed; look it up with `list_for_day` before resubmitting.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Local, NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, error, info, warn};

use smartpos_core::validation::{
    validate_cart_size, validate_price_minor, validate_product_id, validate_quantity,
    validate_reference_id, validate_table_number, validate_tender_amount,
};
use smartpos_core::{
    compute_totals, ActiveTax, CartLine, CheckoutContext, CheckoutError, CheckoutResult,
    CommittedOrder, Money, Order, OrderLine, OrderPayment, OrderType, PaymentLabel,
    PricingResult, Tender,
};
use smartpos_db::repository::order::generate_id;
use smartpos_db::{Database, DbError, OrderRepository, ProductRepository, QueueCounterRepository};

use crate::config::CheckoutConfig;
use crate::events::{CheckoutEvent, EventBus};

// =============================================================================
// Attempt Outcome
// =============================================================================

/// Why one transaction attempt did not commit.
#[derive(Debug)]
enum AttemptError {
    /// Domain rejection found against live data. Final.
    Rejected(CheckoutError),
    /// Lock contention or queue collision. Worth another attempt.
    Contended(DbError),
    /// Any other storage failure. Final.
    Storage(DbError),
    /// The attempt exceeded `commit_timeout`.
    TimedOut,
}

impl From<DbError> for AttemptError {
    fn from(err: DbError) -> Self {
        if err.is_busy() || err.is_queue_collision() {
            AttemptError::Contended(err)
        } else {
            AttemptError::Storage(err)
        }
    }
}

impl From<sqlx::Error> for AttemptError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

/// Everything the transaction needs, computed before it opens.
struct CommitPlan<'a> {
    lines: &'a [CartLine],
    tenders: &'a [Tender],
    ctx: &'a CheckoutContext,
    pricing: PricingResult,
    tax: ActiveTax,
    table_number: String,
    payment_label: PaymentLabel,
    tendered: Money,
    created_at: DateTime<Utc>,
    business_date: NaiveDate,
}

// =============================================================================
// Processor
// =============================================================================

/// Commits checkouts against one database.
///
/// Cheap to clone; clones share the pool and the event channel, so each
/// register session can hold its own handle.
///
/// ## Usage
/// ```rust,ignore
/// let processor = CheckoutProcessor::new(db, CheckoutConfig::load_or_default(None));
/// let committed = processor
///     .commit_checkout(&lines, &tenders, &CheckoutContext::take_away())
///     .await?;
/// println!("Queue #{}", committed.order.queue_number);
/// ```
#[derive(Debug, Clone)]
pub struct CheckoutProcessor {
    db: Database,
    config: CheckoutConfig,
    events: EventBus,
}

impl CheckoutProcessor {
    pub fn new(db: Database, config: CheckoutConfig) -> Self {
        let events = EventBus::new(config.checkout.event_capacity);
        CheckoutProcessor { db, config, events }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Receives [`CheckoutEvent`]s for every later commit.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<CheckoutEvent> {
        self.events.subscribe()
    }

    /// Authoritative totals for a cart under the configured tax, without
    /// committing anything. Lets the register preview the bill.
    pub fn quote(&self, lines: &[CartLine], ctx: &CheckoutContext) -> CheckoutResult<PricingResult> {
        let discount = ctx.discount.as_ref().map(|d| &d.discount);
        Ok(compute_totals(lines, discount, self.config.active_tax().rate)?)
    }

    /// Commits a checkout using the current local time as the business day.
    pub async fn commit_checkout(
        &self,
        lines: &[CartLine],
        tenders: &[Tender],
        ctx: &CheckoutContext,
    ) -> CheckoutResult<CommittedOrder> {
        self.commit_checkout_at(lines, tenders, ctx, Local::now()).await
    }

    /// Commits a checkout as of `now`.
    ///
    /// `now.date_naive()` is the business day whose queue counter is used.
    ///
    /// ## Returns
    /// * `Ok(CommittedOrder)` - Header, lines and payments as persisted
    /// * `Err(CheckoutError)` - Nothing was written
    pub async fn commit_checkout_at(
        &self,
        lines: &[CartLine],
        tenders: &[Tender],
        ctx: &CheckoutContext,
        now: DateTime<Local>,
    ) -> CheckoutResult<CommittedOrder> {
        let plan = match self.prepare(lines, tenders, ctx, now) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(code = ?err.code(), error = %err, "Checkout rejected before commit");
                return Err(err);
            }
        };

        let committed = self.commit_with_retry(&plan).await?;

        info!(
            order_id = %committed.order.id,
            queue_number = committed.order.queue_number,
            business_date = %committed.order.business_date,
            total = committed.order.total_minor,
            lines = committed.lines.len(),
            payment_method = ?committed.order.payment_method,
            "Checkout committed"
        );

        let receivers = self.events.publish(CheckoutEvent::order_committed(&committed));
        debug!(receivers, "Published OrderCommitted");

        Ok(committed)
    }

    // =========================================================================
    // Preconditions
    // =========================================================================

    /// Validates input and prices the cart. Performs no I/O.
    fn prepare<'a>(
        &self,
        lines: &'a [CartLine],
        tenders: &'a [Tender],
        ctx: &'a CheckoutContext,
        now: DateTime<Local>,
    ) -> CheckoutResult<CommitPlan<'a>> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        if tenders.is_empty() {
            return Err(CheckoutError::NoPayment);
        }

        let table_number = ctx
            .resolved_table_number()
            .ok_or(CheckoutError::TableNumberRequired)?;
        if ctx.order_type == OrderType::DineIn {
            validate_table_number(&table_number)?;
        }

        validate_cart_size(lines.len())?;
        for line in lines {
            validate_product_id(&line.product_id)?;
            validate_quantity(line.quantity)?;
            validate_price_minor(line.unit_price.minor())?;
        }

        for (index, tender) in tenders.iter().enumerate() {
            let invalid = |reason: String| CheckoutError::InvalidTender { index, reason };

            validate_tender_amount(tender.amount.minor()).map_err(|e| invalid(e.to_string()))?;
            if let Some(reference) = &tender.reference_id {
                validate_reference_id(reference).map_err(|e| invalid(e.to_string()))?;
            }
        }

        let tax = self.config.active_tax();
        let discount = ctx.discount.as_ref().map(|d| &d.discount);
        let pricing = compute_totals(lines, discount, tax.rate)?;

        if let Some(summary) = &ctx.client_summary {
            if !pricing.matches(summary) {
                warn!(
                    client_total = summary.grand_total.minor(),
                    server_total = pricing.grand_total.minor(),
                    client_tax = summary.tax.minor(),
                    server_tax = pricing.tax_amount.minor(),
                    "Client summary differs from recomputed totals; using recomputed"
                );
            }
        }

        let tendered = tenders
            .iter()
            .try_fold(Money::zero(), |acc, t| acc.checked_add(t.amount))
            .ok_or_else(|| CheckoutError::InvalidInput {
                reason: "tendered total overflows".to_string(),
            })?;

        let covered = tendered
            .checked_add(self.config.payment_tolerance())
            .unwrap_or(tendered);
        if covered < pricing.grand_total {
            return Err(CheckoutError::InsufficientPayment {
                required: pricing.grand_total,
                tendered,
            });
        }

        let payment_label = PaymentLabel::for_tenders(tenders).ok_or(CheckoutError::NoPayment)?;

        Ok(CommitPlan {
            lines,
            tenders,
            ctx,
            pricing,
            tax,
            table_number,
            payment_label,
            tendered,
            created_at: now.with_timezone(&Utc),
            business_date: now.date_naive(),
        })
    }

    // =========================================================================
    // Transaction + Retry
    // =========================================================================

    /// Runs the transaction, retrying contended attempts with backoff.
    async fn commit_with_retry(&self, plan: &CommitPlan<'_>) -> CheckoutResult<CommittedOrder> {
        let max_attempts = self.config.max_attempts();
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let outcome =
                match tokio::time::timeout(self.config.commit_timeout(), self.stage_order(plan))
                    .await
                {
                    Ok(Ok((tx, committed))) => tx
                        .commit()
                        .await
                        .map(|()| committed)
                        .map_err(AttemptError::from),
                    Ok(Err(err)) => Err(err),
                    Err(_) => Err(AttemptError::TimedOut),
                };

            match outcome {
                Ok(committed) => return Ok(committed),

                Err(AttemptError::Rejected(err)) => return Err(err),

                Err(AttemptError::Contended(db_err)) if attempt < max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or_else(|| self.config.max_backoff());
                    warn!(
                        attempt,
                        max_attempts,
                        business_date = %plan.business_date,
                        delay_ms = delay.as_millis() as u64,
                        error = %db_err,
                        "Checkout contended, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }

                Err(AttemptError::Contended(db_err)) => {
                    warn!(
                        attempts = attempt,
                        business_date = %plan.business_date,
                        error = %db_err,
                        "Checkout still contended, giving up"
                    );
                    return Err(CheckoutError::ConcurrentQueueConflict {
                        business_date: plan.business_date,
                        attempts: attempt,
                    });
                }

                Err(AttemptError::Storage(db_err)) => {
                    error!(error = %db_err, attempt, "Checkout failed in storage");
                    return Err(CheckoutError::PersistenceFailure {
                        reason: db_err.to_string(),
                    });
                }

                Err(AttemptError::TimedOut) => {
                    error!(
                        timeout_ms = self.config.checkout.commit_timeout_ms,
                        attempt,
                        "Checkout timed out; transaction rolled back"
                    );
                    return Err(CheckoutError::PersistenceFailure {
                        reason: format!(
                            "commit timed out after {} ms",
                            self.config.checkout.commit_timeout_ms
                        ),
                    });
                }
            }
        }
    }

    /// Writes one attempt into an open transaction and hands it back
    /// uncommitted. Dropping it rolls everything back, which also covers
    /// timeout and caller cancellation.
    async fn stage_order(
        &self,
        plan: &CommitPlan<'_>,
    ) -> Result<(Transaction<'static, Sqlite>, CommittedOrder), AttemptError> {
        let mut tx = self.db.pool().begin().await?;

        let queue_number = QueueCounterRepository::reserve_next(&mut tx, plan.business_date).await?;
        let order_id = generate_id();

        let mut order_lines = Vec::with_capacity(plan.lines.len());
        for (position, line) in plan.lines.iter().enumerate() {
            let product = match ProductRepository::fetch_for_checkout(&mut tx, &line.product_id)
                .await?
            {
                Some(product) => product,
                None => {
                    warn!(
                        product_id = %line.product_id,
                        queue_number,
                        "Checkout rejected: product not found"
                    );
                    return Err(AttemptError::Rejected(CheckoutError::ProductNotFound {
                        product_id: line.product_id.clone(),
                    }));
                }
            };

            let decremented = product.can_sell(line.quantity)
                && ProductRepository::try_decrement_stock(&mut tx, &product.id, line.quantity)
                    .await?;
            if !decremented {
                warn!(
                    product_id = %product.id,
                    available = product.stock,
                    requested = line.quantity,
                    queue_number,
                    "Checkout rejected: insufficient stock"
                );
                return Err(AttemptError::Rejected(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    available: product.stock,
                    requested: line.quantity,
                }));
            }

            order_lines.push(OrderLine {
                id: generate_id(),
                order_id: order_id.clone(),
                product_id: Some(product.id),
                product_name_snapshot: product.name,
                sku_snapshot: product.sku,
                cost_price_minor_snapshot: product.cost_price_minor,
                quantity: line.quantity,
                price_at_time_minor: line.unit_price.minor(),
                line_total_minor: line.unit_price.multiply_quantity(line.quantity).minor(),
                position: position as i64,
            });
        }

        let order = self.build_order(plan, order_id, queue_number);
        OrderRepository::insert_order(&mut tx, &order).await?;
        OrderRepository::insert_lines(&mut tx, &order_lines).await?;

        let payments: Vec<OrderPayment> = plan
            .tenders
            .iter()
            .enumerate()
            .map(|(position, tender)| OrderPayment {
                id: generate_id(),
                order_id: order.id.clone(),
                method: tender.method,
                amount_minor: tender.amount.minor(),
                reference_id: tender.reference_id.clone(),
                position: position as i64,
                created_at: plan.created_at,
            })
            .collect();
        OrderRepository::insert_payments(&mut tx, &payments).await?;

        let staged = CommittedOrder {
            order,
            lines: order_lines,
            payments,
        };
        Ok((tx, staged))
    }

    /// Builds the header from the recomputed totals, never the client's.
    fn build_order(&self, plan: &CommitPlan<'_>, id: String, queue_number: i64) -> Order {
        let ctx = plan.ctx;
        let pricing = &plan.pricing;

        Order {
            id,
            created_at: plan.created_at,
            business_date: plan.business_date,
            queue_number,
            order_type: ctx.order_type,
            table_number: plan.table_number.clone(),
            customer_name: ctx.resolved_customer_name(),
            customer_phone: ctx.customer_phone.clone(),
            member_id: ctx.member_id.clone(),
            discount_id: ctx.discount.as_ref().map(|d| d.id.clone()),
            cashier_id: ctx.cashier_id.clone(),
            subtotal_minor: pricing.subtotal.minor(),
            discount_minor: pricing.discount_amount.minor(),
            tax_minor: pricing.tax_amount.minor(),
            total_minor: pricing.grand_total.minor(),
            tax_name_snapshot: plan.tax.name.clone(),
            tax_rate_bps_snapshot: plan.tax.rate.bps(),
            payment_method: plan.payment_label,
            amount_tendered_minor: plan.tendered.minor(),
            change_minor: plan.tendered.saturating_sub_zero(pricing.grand_total).minor(),
        }
    }

    /// Creates the jittered exponential backoff for contended attempts.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_backoff(),
            max_interval: self.config.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartpos_core::{ClientSummary, Discount, PaymentMethod, Product, TaxRate};
    use smartpos_db::DbConfig;

    async fn setup() -> CheckoutProcessor {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        CheckoutProcessor::new(db, CheckoutConfig::default())
    }

    async fn seed(processor: &CheckoutProcessor, price: i64, stock: i64) -> Product {
        let product = Product::new("Nasi Goreng", Money::from_minor(price), stock, Utc::now())
            .with_sku("MAKAN-01")
            .with_cost(Money::from_minor(12_000));
        processor.database().products().insert(&product).await.unwrap();
        product
    }

    fn cash(amount: i64) -> Tender {
        Tender::new(PaymentMethod::Cash, Money::from_minor(amount))
    }

    #[tokio::test]
    async fn test_preconditions_in_order() {
        let processor = setup().await;
        let line = CartLine::new("p-1", 1, Money::from_minor(10_000));
        let ctx = CheckoutContext::take_away();

        let err = processor.commit_checkout(&[], &[], &ctx).await.unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);

        let err = processor.commit_checkout(&[line.clone()], &[], &ctx).await.unwrap_err();
        assert_eq!(err, CheckoutError::NoPayment);

        let dine_in = CheckoutContext::dine_in("   ");
        let err = processor
            .commit_checkout(&[line.clone()], &[cash(0)], &dine_in)
            .await
            .unwrap_err();
        assert_eq!(err, CheckoutError::TableNumberRequired);

        let err = processor
            .commit_checkout(&[line], &[cash(10_000)], &ctx)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CheckoutError::InsufficientPayment {
                required: Money::from_minor(11_000),
                tendered: Money::from_minor(10_000),
            }
        );

        assert_eq!(processor.database().orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_lines_and_tenders() {
        let processor = setup().await;
        let ctx = CheckoutContext::take_away();

        let zero_qty = CartLine::new("p-1", 0, Money::from_minor(10_000));
        let err = processor
            .commit_checkout(&[zero_qty], &[cash(50_000)], &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidInput { .. }));

        let negative_price = CartLine::new("p-1", 1, Money::from_minor(-1));
        let err = processor
            .commit_checkout(&[negative_price], &[cash(50_000)], &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidInput { .. }));

        let line = CartLine::new("p-1", 1, Money::from_minor(10_000));
        let err = processor
            .commit_checkout(&[line], &[cash(50_000), cash(-5)], &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTender { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_change_and_snapshot() {
        let processor = setup().await;
        let product = seed(&processor, 15_000, 10).await;
        let lines = [CartLine::new(&product.id, 2, product.price())];

        let committed = processor
            .commit_checkout(&lines, &[cash(50_000)], &CheckoutContext::take_away())
            .await
            .unwrap();

        let order = &committed.order;
        assert_eq!(order.queue_number, 1);
        assert_eq!(order.subtotal_minor, 30_000);
        assert_eq!(order.tax_minor, 3_000);
        assert_eq!(order.total_minor, 33_000);
        assert_eq!(order.change_minor, 17_000);
        assert_eq!(order.amount_tendered_minor, 50_000);
        assert_eq!(order.payment_method, PaymentLabel::Cash);
        assert_eq!(order.table_number, "TAKE AWAY");
        assert_eq!(order.customer_name, "Guest");
        assert_eq!(order.tax_name_snapshot, "PB1");
        assert_eq!(order.tax_rate_bps_snapshot, 1000);

        let line = &committed.lines[0];
        assert_eq!(line.product_name_snapshot, "Nasi Goreng");
        assert_eq!(line.sku_snapshot.as_deref(), Some("MAKAN-01"));
        assert_eq!(line.cost_price_minor_snapshot, 12_000);
        assert_eq!(line.line_total_minor, 30_000);

        let stock = processor.database().products().get_by_id(&product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 8);
    }

    #[tokio::test]
    async fn test_client_summary_is_not_trusted() {
        let processor = setup().await;
        let product = seed(&processor, 15_000, 10).await;
        let lines = [CartLine::new(&product.id, 2, product.price())];
        let ctx = CheckoutContext::take_away().with_client_summary(ClientSummary {
            subtotal: Money::from_minor(1),
            discount: Money::zero(),
            tax: Money::zero(),
            grand_total: Money::from_minor(1),
        });

        let err = processor.commit_checkout(&lines, &[cash(1)], &ctx).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientPayment { .. }));

        let committed = processor.commit_checkout(&lines, &[cash(33_000)], &ctx).await.unwrap();
        assert_eq!(committed.order.total_minor, 33_000);
    }

    #[tokio::test]
    async fn test_discount_and_tolerance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = CheckoutConfig::default()
            .with_tax("PPN", TaxRate::from_bps(1000))
            .with_payment_tolerance(100);
        let processor = CheckoutProcessor::new(db, config);
        let product = seed(&processor, 15_000, 10).await;
        let lines = [CartLine::new(&product.id, 2, product.price())];
        let ctx = CheckoutContext::take_away().with_discount("promo-10", Discount::percent(10));

        assert_eq!(processor.quote(&lines, &ctx).unwrap().grand_total.minor(), 29_700);

        let committed = processor.commit_checkout(&lines, &[cash(29_650)], &ctx).await.unwrap();
        assert_eq!(committed.order.discount_minor, 3_000);
        assert_eq!(committed.order.total_minor, 29_700);
        assert_eq!(committed.order.change_minor, 0);
        assert_eq!(committed.order.discount_id.as_deref(), Some("promo-10"));
        assert_eq!(committed.order.tax_name_snapshot, "PPN");
    }
}
