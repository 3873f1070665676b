//! Delivery notifier adapters.
//!
//! - `TracingNotifier` - emits a structured log line per issued link
//! - `RecordingNotifier` - captures notices in memory for assertions

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{DeliveryNotifier, TokenIssuedNotice};

/// Logs issued links without sending anything.
///
/// The token value is never written; operators see which order and
/// recipient received a link and when it expires.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeliveryNotifier for TracingNotifier {
    async fn token_issued(&self, notice: &TokenIssuedNotice) -> Result<(), DomainError> {
        tracing::info!(
            order_id = %notice.order_id,
            recipient = %notice.buyer_email,
            expires_at = %notice.expires_at.as_datetime(),
            "Download link ready for delivery"
        );
        Ok(())
    }
}

/// Captures every notice it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<TokenIssuedNotice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured notices, oldest first.
    pub async fn notices(&self) -> Vec<TokenIssuedNotice> {
        self.notices.lock().await.clone()
    }
}

#[async_trait]
impl DeliveryNotifier for RecordingNotifier {
    async fn token_issued(&self, notice: &TokenIssuedNotice) -> Result<(), DomainError> {
        self.notices.lock().await.push(notice.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::TokenValue;
    use crate::domain::foundation::{OrderId, Timestamp};

    fn notice() -> TokenIssuedNotice {
        TokenIssuedNotice {
            order_id: OrderId::new(),
            buyer_email: "a@b.com".to_string(),
            token: TokenValue::generate(),
            expires_at: Timestamp::now().plus_secs(3600),
        }
    }

    #[tokio::test]
    async fn tracing_notifier_always_succeeds() {
        assert!(TracingNotifier::new().token_issued(&notice()).await.is_ok());
    }

    #[tokio::test]
    async fn recording_notifier_keeps_notices_in_order() {
        let notifier = RecordingNotifier::new();
        let first = notice();
        let second = notice();

        notifier.token_issued(&first).await.unwrap();
        notifier.token_issued(&second).await.unwrap();

        assert_eq!(notifier.notices().await, vec![first, second]);
    }
}
