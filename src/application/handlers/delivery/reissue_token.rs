//! ReissueTokenHandler - issues a fresh download link for a paid order.

use std::sync::Arc;

use crate::domain::delivery::{DeliveryError, DownloadToken};
use crate::domain::foundation::SessionId;
use crate::ports::{DeliveryNotifier, OrderRepository, TokenIssuedNotice};

use super::TokenVault;

/// Command to reissue a download link.
#[derive(Debug, Clone)]
pub struct ReissueTokenCommand {
    pub session_id: SessionId,
}

/// Result of a successful reissue.
#[derive(Debug, Clone)]
pub struct ReissueTokenResult {
    pub token: DownloadToken,
}

/// Handler for reissuing tokens, e.g. after the initial link expired.
///
/// Only completed orders qualify. Existing tokens are left untouched.
pub struct ReissueTokenHandler {
    orders: Arc<dyn OrderRepository>,
    vault: TokenVault,
    notifier: Arc<dyn DeliveryNotifier>,
}

impl ReissueTokenHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        vault: TokenVault,
        notifier: Arc<dyn DeliveryNotifier>,
    ) -> Self {
        Self {
            orders,
            vault,
            notifier,
        }
    }

    pub async fn handle(&self, cmd: ReissueTokenCommand) -> Result<ReissueTokenResult, DeliveryError> {
        let order = self
            .orders
            .find_by_session_id(&cmd.session_id)
            .await?
            .ok_or_else(|| DeliveryError::OrderNotFound(cmd.session_id.clone()))?;

        if !order.is_paid() {
            return Err(DeliveryError::NotPaid {
                order_id: order.id,
                status: order.status,
            });
        }

        let token = self.vault.issue(order.id).await?;
        tracing::info!(order_id = %order.id, "Download token reissued");

        let notice = TokenIssuedNotice {
            order_id: order.id,
            buyer_email: order.buyer_email.clone(),
            token: token.token.clone(),
            expires_at: token.expires_at,
        };
        if let Err(err) = self.notifier.token_issued(&notice).await {
            tracing::warn!(order_id = %order.id, error = %err, "Failed to notify buyer of reissued token");
        }

        Ok(ReissueTokenResult { token })
    }
}
