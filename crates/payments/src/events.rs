//! Fire-and-forget payment event publishing.
//!
//! Events are handed to an unbounded channel and drained by a spawned
//! worker that logs them as structured JSON. Delivery never blocks the
//! payment path and failures never surface to the caller.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId, PaymentStatus};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A payment lifecycle event destined for an external bus.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentEvent {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
    pub error_message: Option<String>,
}

impl PaymentEvent {
    /// Builds the event for a finished payment attempt.
    pub fn from_outcome(
        payment_id: PaymentId,
        order_id: OrderId,
        amount: Money,
        payment_method: String,
        status: PaymentStatus,
        provider_reference: Option<String>,
        error_message: Option<String>,
    ) -> Self {
        let event_type = match status {
            PaymentStatus::Completed => "PaymentCompleted",
            _ => "PaymentFailed",
        };
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            occurred_at: Utc::now(),
            payment_id,
            order_id,
            amount,
            payment_method,
            status,
            provider_reference,
            error_message,
        }
    }
}

/// Handle for publishing payment events without awaiting delivery.
#[derive(Clone)]
pub struct EventPublisher {
    sender: mpsc::UnboundedSender<PaymentEvent>,
}

impl EventPublisher {
    /// Spawns the drain worker and returns the publishing handle.
    pub fn spawn() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<PaymentEvent>();

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match serde_json::to_string(&event) {
                    Ok(payload) => {
                        tracing::info!(
                            target: "payment_events",
                            event_type = event.event_type,
                            %event.payment_id,
                            %event.order_id,
                            %payload,
                            "payment event published"
                        );
                        metrics::counter!("payment_events_published_total").increment(1);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to serialize payment event");
                        metrics::counter!("payment_events_dropped_total").increment(1);
                    }
                }
            }
        });

        Self { sender }
    }

    /// Publishes an event. A closed channel is logged and counted, never
    /// surfaced.
    pub fn publish(&self, event: PaymentEvent) {
        if self.sender.send(event).is_err() {
            tracing::warn!("payment event channel closed; event dropped");
            metrics::counter!("payment_events_dropped_total").increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_is_non_blocking_and_infallible() {
        let publisher = EventPublisher::spawn();
        let event = PaymentEvent::from_outcome(
            PaymentId::new(),
            OrderId::new(),
            Money::from_cents(5000),
            "CARD".to_string(),
            PaymentStatus::Completed,
            Some("SIM-TXN-1".to_string()),
            None,
        );

        publisher.publish(event.clone());
        publisher.publish(event);
        // Let the worker drain; nothing to assert beyond not panicking.
        tokio::task::yield_now().await;
    }

    #[test]
    fn event_type_follows_status() {
        let completed = PaymentEvent::from_outcome(
            PaymentId::new(),
            OrderId::new(),
            Money::from_cents(100),
            "CARD".to_string(),
            PaymentStatus::Completed,
            None,
            None,
        );
        let failed = PaymentEvent::from_outcome(
            PaymentId::new(),
            OrderId::new(),
            Money::from_cents(100),
            "CARD".to_string(),
            PaymentStatus::Failed,
            None,
            Some("declined".to_string()),
        );
        assert_eq!(completed.event_type, "PaymentCompleted");
        assert_eq!(failed.event_type, "PaymentFailed");
    }
}
