use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    PaymentConfirmed,
    ExpiryReminder,
    ExpiryNotice,
    OfferReceived,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PaymentConfirmed => "PAYMENT_CONFIRMED",
            NotificationKind::ExpiryReminder => "EXPIRY_REMINDER",
            NotificationKind::ExpiryNotice => "EXPIRY_NOTICE",
            NotificationKind::OfferReceived => "OFFER_RECEIVED",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget notification collaborator. Callers log failures and
/// move on; a failed notification never rolls back core state.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        data: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default collaborator: logs the notification and succeeds. Real delivery
/// lives outside this core.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        data: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(kind = %kind, recipient = %gridlot_shared::pii::Masked(recipient), %data, "notification dispatched");
        Ok(())
    }
}
