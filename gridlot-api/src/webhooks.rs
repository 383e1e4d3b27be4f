use axum::{extract::State, http::StatusCode, Json};
use gridlot_core::payment::PaymentEvent;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
}

/// The provider's loose payload is translated into the narrow event enum
/// exactly once, here. Unknown or malformed events are acknowledged and
/// dropped; the provider's retry policy covers transient failures.
fn translate(payload: &PaymentWebhook) -> Option<PaymentEvent> {
    let object = &payload.data.object;
    match payload.type_.as_str() {
        "checkout.session.completed" => Some(PaymentEvent::SessionCompleted {
            session_ref: object.id.clone(),
            charge_ref: object.payment_intent.clone()?,
            customer_ref: object.customer.clone(),
        }),
        "checkout.session.expired" => Some(PaymentEvent::SessionExpired {
            session_ref: object.id.clone(),
        }),
        "charge.refunded" => Some(PaymentEvent::ChargeRefunded {
            charge_ref: object.id.clone(),
        }),
        _ => None,
    }
}

/// POST /v1/webhooks/payments
/// Receive payment lifecycle events from the provider. Delivery is
/// at-least-once; every transition below is status-guarded, so replays
/// are no-ops.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<StatusCode, StatusCode> {
    tracing::info!("Received webhook: {} ({})", payload.type_, payload.id);

    let Some(event) = translate(&payload) else {
        tracing::debug!("ignoring webhook event type {}", payload.type_);
        return Ok(StatusCode::OK);
    };

    match state.activation.apply(event).await {
        Ok(outcome) => {
            if !outcome.applied() {
                tracing::debug!("webhook {} matched no booking (duplicate delivery?)", payload.id);
            }
            Ok(StatusCode::OK)
        }
        Err(err) => {
            // A 5xx asks the provider to redeliver; the status guards make
            // the retry safe.
            tracing::error!("webhook {} failed: {}", payload.id, err);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(kind: &str, intent: Option<&str>) -> PaymentWebhook {
        PaymentWebhook {
            id: "evt_1".into(),
            type_: kind.into(),
            data: WebhookData {
                object: WebhookObject {
                    id: "cs_123".into(),
                    payment_intent: intent.map(String::from),
                    customer: None,
                },
            },
        }
    }

    #[test]
    fn translates_known_event_types() {
        let completed = translate(&payload("checkout.session.completed", Some("pi_9"))).unwrap();
        assert_eq!(
            completed,
            PaymentEvent::SessionCompleted {
                session_ref: "cs_123".into(),
                charge_ref: "pi_9".into(),
                customer_ref: None,
            }
        );
        assert!(matches!(
            translate(&payload("checkout.session.expired", None)).unwrap(),
            PaymentEvent::SessionExpired { .. }
        ));
        assert!(matches!(
            translate(&payload("charge.refunded", None)).unwrap(),
            PaymentEvent::ChargeRefunded { .. }
        ));
    }

    #[test]
    fn drops_unknown_and_malformed_events() {
        assert!(translate(&payload("invoice.paid", None)).is_none());
        // Completed without a charge reference is malformed, not a crash.
        assert!(translate(&payload("checkout.session.completed", None)).is_none());
    }
}
