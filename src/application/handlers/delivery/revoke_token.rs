//! RevokeTokenHandler - command handler for revoking a download link.

use crate::domain::foundation::DomainError;

use super::TokenVault;

/// Command to revoke a token.
#[derive(Debug, Clone)]
pub struct RevokeTokenCommand {
    pub token: String,
}

/// Result of revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevokeTokenResult {
    /// False if no such token exists.
    pub revoked: bool,
}

pub struct RevokeTokenHandler {
    vault: TokenVault,
}

impl RevokeTokenHandler {
    pub fn new(vault: TokenVault) -> Self {
        Self { vault }
    }

    pub async fn handle(&self, cmd: RevokeTokenCommand) -> Result<RevokeTokenResult, DomainError> {
        let revoked = self.vault.revoke(&cmd.token).await?;
        if revoked {
            tracing::info!("Download token revoked");
        } else {
            tracing::debug!("Revocation requested for unknown token");
        }
        Ok(RevokeTokenResult { revoked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryDownloadTokenRepository, InMemoryOrderRepository};
    use crate::domain::delivery::TokenPolicy;
    use crate::domain::foundation::OrderId;
    use chrono::Duration;
    use std::sync::Arc;

    fn vault() -> TokenVault {
        TokenVault::new(
            Arc::new(InMemoryDownloadTokenRepository::new()),
            Arc::new(InMemoryOrderRepository::new()),
            TokenPolicy::new(Duration::hours(72), 3).unwrap(),
        )
    }

    #[tokio::test]
    async fn revokes_existing_token_idempotently() {
        let vault = vault();
        let token = vault.issue(OrderId::new()).await.unwrap();
        let handler = RevokeTokenHandler::new(vault);
        let cmd = RevokeTokenCommand {
            token: token.token.as_str().to_string(),
        };

        assert!(handler.handle(cmd.clone()).await.unwrap().revoked);
        assert!(handler.handle(cmd).await.unwrap().revoked);
    }

    #[tokio::test]
    async fn unknown_token_is_not_revoked() {
        let handler = RevokeTokenHandler::new(vault());
        let result = handler
            .handle(RevokeTokenCommand {
                token: "unknown".to_string(),
            })
            .await
            .unwrap();
        assert!(!result.revoked);
    }
}
