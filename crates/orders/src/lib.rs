//! Order workflow and order query.
//!
//! [`OrderWorkflow`] runs the distributed checkout: one transaction that
//! debits inventory under row locks, records the order with its line
//! items, charges the payment simulator, and finalizes the status. The
//! post-commit enrichment and confirmation notification never affect the
//! committed transaction. [`query::get_order`] reconstructs the
//! authorized enriched view for reads.

pub mod error;
pub mod notify;
pub mod query;
pub mod workflow;

pub use error::OrderError;
pub use notify::{
    ConfirmationLine, DeliveryError, LoggingSink, NotificationSink, Notifier, OrderConfirmation,
    RecordingSink,
};
pub use query::{OrderItemView, OrderSummary, OrderView, PaymentView, get_order};
pub use workflow::{NewOrder, NewOrderItem, OrderWorkflow, PlacedOrder, PlacedOrderItem};
