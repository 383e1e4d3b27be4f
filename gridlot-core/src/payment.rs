use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbound checkout request handed to the payment collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub amount_cents: i64,
    pub description: String,
    pub success_ref: String,
    pub cancel_ref: String,
    pub buyer_email: String,
}

/// Redirect handle returned by the collaborator. The session id is stored
/// on the booking and keys the confirmation webhook later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// Inbound payment events. The raw provider payload is translated into
/// this enum exactly once, at the webhook edge; everything below the edge
/// matches exhaustively on these variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    SessionCompleted {
        session_ref: String,
        charge_ref: String,
        customer_ref: Option<String>,
    },
    SessionExpired {
        session_ref: String,
    },
    ChargeRefunded {
        charge_ref: String,
    },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session with the provider. Signature verification of
    /// the events the provider sends back is the provider's contract
    /// obligation, assumed satisfied before they reach this core.
    async fn create_checkout(
        &self,
        req: &CheckoutRequest,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>>;
}

/// Stand-in gateway for development mode and tests. Issues a unique
/// session id so the activation webhook path can be exercised end to end.
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout(
        &self,
        req: &CheckoutRequest,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>> {
        let session_id = format!("cs_mock_{}", Uuid::new_v4().simple());
        tracing::info!(
            amount_cents = req.amount_cents,
            session = %session_id,
            "mock checkout session created"
        );
        Ok(CheckoutSession {
            redirect_url: format!("https://payments.invalid/checkout/{}", session_id),
            session_id,
        })
    }
}
