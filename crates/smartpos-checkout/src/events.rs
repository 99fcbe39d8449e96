//! # Post-Commit Events
//!
//! Notifications published after a checkout transaction has committed.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit_checkout ──► tx.commit() ──► broadcast::Sender::send()         │
//! │                                            │                           │
//! │                     ┌──────────────────────┼───────────────────┐       │
//! │                     ▼                      ▼                   ▼       │
//! │               catalog cache          history view        kitchen view  │
//! │               (stock changed)        (new order)         (queue no.)   │
//! │                                                                         │
//! │  No subscribers, or a lagging one, never fails the checkout.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;

use smartpos_core::CommittedOrder;

/// Something read-side views should refresh for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutEvent {
    /// An order and its stock decrements are durable.
    OrderCommitted {
        order_id: String,
        business_date: NaiveDate,
        queue_number: i64,
        /// Products whose stock changed, in cart order.
        product_ids: Vec<String>,
    },
}

impl CheckoutEvent {
    pub fn order_committed(committed: &CommittedOrder) -> Self {
        CheckoutEvent::OrderCommitted {
            order_id: committed.order.id.clone(),
            business_date: committed.order.business_date,
            queue_number: committed.order.queue_number,
            product_ids: committed
                .lines
                .iter()
                .filter_map(|line| line.product_id.clone())
                .collect(),
        }
    }
}

/// Publishing half of the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CheckoutEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Returns a new receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CheckoutEvent> {
        self.tx.subscribe()
    }

    /// Best-effort publish. Returns how many subscribers received it.
    pub fn publish(&self, event: CheckoutEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed_event() -> CheckoutEvent {
        CheckoutEvent::OrderCommitted {
            order_id: "order-1".to_string(),
            business_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            queue_number: 7,
            product_ids: vec!["p-1".to_string()],
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(committed_event()), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        assert_eq!(bus.publish(committed_event()), 1);
        assert_eq!(rx.recv().await.unwrap(), committed_event());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&committed_event()).unwrap();
        assert!(json.contains("\"type\":\"order_committed\""));
        assert!(json.contains("\"queue_number\":7"));
        assert!(json.contains("\"business_date\":\"2026-10-19\""));
    }
}
