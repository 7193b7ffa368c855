//! Payment gateway trait and the simulated implementation.

use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderId, PaymentId, PaymentStatus};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Probability that an unforced charge succeeds.
pub const SUCCESS_PROBABILITY: f64 = 0.8;

/// Error message recorded for every simulated decline.
pub const DECLINE_MESSAGE: &str = "Simulated payment failure";

/// Caller-forced outcome, used by tests and by the simulate flag on the
/// payment endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForcedOutcome {
    Success,
    Failed,
}

/// A well-formed charge request. The payment identity is part of the
/// request so provider references can be tied to the attempt.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: String,
    pub forced: Option<ForcedOutcome>,
}

/// Outcome of a charge. Never an error: a well-formed request always
/// resolves to completed or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Completed { provider_reference: String },
    Failed { error_message: String },
}

impl ChargeOutcome {
    /// Maps the outcome onto the persisted payment status.
    pub fn status(&self) -> PaymentStatus {
        match self {
            ChargeOutcome::Completed { .. } => PaymentStatus::Completed,
            ChargeOutcome::Failed { .. } => PaymentStatus::Failed,
        }
    }
}

/// A payment processor the order workflow can charge against.
///
/// Implementations used from inside the checkout transaction must be
/// in-process and must not perform blocking external I/O, since inventory
/// row locks are held until the transaction commits.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges the given amount. Infallible for well-formed requests.
    async fn charge(&self, request: &ChargeRequest) -> ChargeOutcome;
}

/// Simulated processor: honors forced outcomes, otherwise succeeds with
/// probability [`SUCCESS_PROBABILITY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedGateway;

impl SimulatedGateway {
    pub fn new() -> Self {
        Self
    }

    fn provider_reference(payment_id: PaymentId) -> String {
        format!("SIM-TXN-{}-{payment_id}", Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, request: &ChargeRequest) -> ChargeOutcome {
        let success = match request.forced {
            Some(ForcedOutcome::Success) => true,
            Some(ForcedOutcome::Failed) => false,
            None => rand::rng().random_bool(SUCCESS_PROBABILITY),
        };

        if success {
            ChargeOutcome::Completed {
                provider_reference: Self::provider_reference(request.payment_id),
            }
        } else {
            ChargeOutcome::Failed {
                error_message: DECLINE_MESSAGE.to_string(),
            }
        }
    }
}

/// Gateway pinned to a single outcome regardless of the request, used by
/// tests that need a deterministic checkout.
#[derive(Debug, Clone, Copy)]
pub struct FixedGateway(pub ForcedOutcome);

#[async_trait]
impl PaymentGateway for FixedGateway {
    async fn charge(&self, request: &ChargeRequest) -> ChargeOutcome {
        let pinned = ChargeRequest {
            forced: Some(self.0),
            ..request.clone()
        };
        SimulatedGateway.charge(&pinned).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(forced: Option<ForcedOutcome>) -> ChargeRequest {
        ChargeRequest {
            payment_id: PaymentId::new(),
            order_id: OrderId::new(),
            amount: Money::from_cents(14997),
            method: "CARD".to_string(),
            forced,
        }
    }

    #[tokio::test]
    async fn forced_success_always_completes() {
        let gateway = SimulatedGateway::new();
        for _ in 0..20 {
            let outcome = gateway.charge(&request(Some(ForcedOutcome::Success))).await;
            assert!(matches!(outcome, ChargeOutcome::Completed { .. }));
        }
    }

    #[tokio::test]
    async fn forced_failure_always_fails_with_fixed_message() {
        let gateway = SimulatedGateway::new();
        let outcome = gateway.charge(&request(Some(ForcedOutcome::Failed))).await;
        match outcome {
            ChargeOutcome::Failed { error_message } => {
                assert_eq!(error_message, DECLINE_MESSAGE);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provider_references_are_unique_per_attempt() {
        let gateway = SimulatedGateway::new();
        let first = gateway.charge(&request(Some(ForcedOutcome::Success))).await;
        let second = gateway.charge(&request(Some(ForcedOutcome::Success))).await;

        let reference = |outcome: ChargeOutcome| match outcome {
            ChargeOutcome::Completed { provider_reference } => provider_reference,
            other => panic!("expected completion, got {other:?}"),
        };

        let first = reference(first);
        let second = reference(second);
        assert!(first.starts_with("SIM-TXN-"));
        assert_ne!(first, second);
    }

    #[test]
    fn outcome_maps_to_payment_status() {
        let completed = ChargeOutcome::Completed {
            provider_reference: "SIM-TXN-1".to_string(),
        };
        let failed = ChargeOutcome::Failed {
            error_message: DECLINE_MESSAGE.to_string(),
        };
        assert_eq!(completed.status(), PaymentStatus::Completed);
        assert_eq!(failed.status(), PaymentStatus::Failed);
    }

    #[test]
    fn forced_outcome_parses_wire_values() {
        let success: ForcedOutcome = serde_json::from_str("\"SUCCESS\"").unwrap();
        let failed: ForcedOutcome = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(success, ForcedOutcome::Success);
        assert_eq!(failed, ForcedOutcome::Failed);
    }
}
