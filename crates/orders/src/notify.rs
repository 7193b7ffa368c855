//! Fire-and-forget order confirmation notifications.
//!
//! The workflow hands a confirmation to the [`Notifier`] after commit;
//! a spawned worker drains the channel and delivers through a
//! [`NotificationSink`]. Delivery failures are logged and counted,
//! never surfaced to the checkout caller.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId};
use thiserror::Error;
use tokio::sync::mpsc;

/// A single line in an order confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmationLine {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Confirmation details for a completed checkout.
#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub recipient_email: String,
    pub customer_name: String,
    pub order_id: OrderId,
    pub lines: Vec<ConfirmationLine>,
    pub total_amount: Money,
}

impl OrderConfirmation {
    /// Renders the plain-text confirmation body.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Hi {},\n\n", self.customer_name));
        out.push_str(&format!(
            "Thank you for your order {}. Here are your order details:\n\nItems:\n",
            self.order_id
        ));
        for line in &self.lines {
            out.push_str(&format!(
                "- {} x {} @ {} = {}\n",
                line.product_name, line.quantity, line.unit_price, line.line_total
            ));
        }
        out.push_str(&format!("\nTotal amount: {}\n", self.total_amount));
        out.push_str("\nThank you for shopping with us.\n");
        out
    }
}

/// Delivery failed; the reason is logged, nothing more.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Destination for order confirmations (email service, message bus, ...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one confirmation.
    async fn deliver(&self, confirmation: &OrderConfirmation) -> Result<(), DeliveryError>;
}

/// Sink that logs the rendered confirmation instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, confirmation: &OrderConfirmation) -> Result<(), DeliveryError> {
        tracing::info!(
            target: "order_notifications",
            order_id = %confirmation.order_id,
            recipient = %confirmation.recipient_email,
            body = %confirmation.render_text(),
            "order confirmation"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    delivered: Vec<OrderConfirmation>,
    fail_on_deliver: bool,
}

/// Sink that records confirmations in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<RwLock<RecordingState>>,
}

impl RecordingSink {
    /// Creates a new recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sink to fail deliveries.
    pub fn set_fail_on_deliver(&self, fail: bool) {
        self.state.write().unwrap().fail_on_deliver = fail;
    }

    /// Returns the number of delivered confirmations.
    pub fn delivered_count(&self) -> usize {
        self.state.read().unwrap().delivered.len()
    }

    /// Returns true if a confirmation for the order was delivered.
    pub fn has_confirmation_for(&self, order_id: OrderId) -> bool {
        self.state
            .read()
            .unwrap()
            .delivered
            .iter()
            .any(|c| c.order_id == order_id)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, confirmation: &OrderConfirmation) -> Result<(), DeliveryError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_deliver {
            return Err(DeliveryError("sink configured to fail".to_string()));
        }
        state.delivered.push(confirmation.clone());
        Ok(())
    }
}

/// Handle for queueing confirmations without awaiting delivery.
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::UnboundedSender<OrderConfirmation>,
}

impl Notifier {
    /// Spawns the drain worker and returns the queueing handle.
    pub fn spawn(sink: Arc<dyn NotificationSink>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<OrderConfirmation>();

        tokio::spawn(async move {
            while let Some(confirmation) = receiver.recv().await {
                match sink.deliver(&confirmation).await {
                    Ok(()) => {
                        metrics::counter!("order_notifications_sent_total").increment(1);
                    }
                    Err(err) => {
                        tracing::error!(
                            order_id = %confirmation.order_id,
                            error = %err,
                            "order confirmation delivery failed"
                        );
                        metrics::counter!("order_notifications_failed_total").increment(1);
                    }
                }
            }
        });

        Self { sender }
    }

    /// Queues a confirmation. A closed channel is logged, never surfaced.
    pub fn notify(&self, confirmation: OrderConfirmation) {
        if self.sender.send(confirmation).is_err() {
            tracing::warn!("notification channel closed; confirmation dropped");
            metrics::counter!("order_notifications_failed_total").increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(order_id: OrderId) -> OrderConfirmation {
        OrderConfirmation {
            recipient_email: "jane@example.com".to_string(),
            customer_name: "Jane Doe".to_string(),
            order_id,
            lines: vec![ConfirmationLine {
                product_name: "Widget".to_string(),
                quantity: 2,
                unit_price: Money::from_cents(4999),
                line_total: Money::from_cents(9998),
            }],
            total_amount: Money::from_cents(9998),
        }
    }

    #[test]
    fn rendered_text_includes_lines_and_total() {
        let text = confirmation(OrderId::new()).render_text();
        assert!(text.contains("Hi Jane Doe"));
        assert!(text.contains("- Widget x 2 @ $49.99 = $99.98"));
        assert!(text.contains("Total amount: $99.98"));
    }

    #[tokio::test]
    async fn notifier_delivers_through_sink() {
        let sink = RecordingSink::new();
        let notifier = Notifier::spawn(Arc::new(sink.clone()));

        let order_id = OrderId::new();
        notifier.notify(confirmation(order_id));

        // Give the drain worker a chance to run.
        for _ in 0..50 {
            if sink.has_confirmation_for(order_id) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("confirmation was not delivered");
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let sink = RecordingSink::new();
        sink.set_fail_on_deliver(true);
        let notifier = Notifier::spawn(Arc::new(sink.clone()));

        notifier.notify(confirmation(OrderId::new()));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(sink.delivered_count(), 0);
    }
}
