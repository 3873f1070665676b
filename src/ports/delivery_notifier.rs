//! Delivery notifier port.
//!
//! The engine hands a freshly issued download link to whatever sends it to
//! the buyer (email, SMS). Sending is outside this crate.

use async_trait::async_trait;

use crate::domain::delivery::TokenValue;
use crate::domain::foundation::{DomainError, OrderId, Timestamp};

/// What the buyer needs to use a new download link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIssuedNotice {
    pub order_id: OrderId,
    pub buyer_email: String,
    pub token: TokenValue,
    pub expires_at: Timestamp,
}

#[async_trait]
pub trait DeliveryNotifier: Send + Sync {
    /// Delivers a new download link to the buyer.
    async fn token_issued(&self, notice: &TokenIssuedNotice) -> Result<(), DomainError>;
}
