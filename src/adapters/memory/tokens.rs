//! In-memory token vault.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::delivery::{DenialReason, DownloadToken, TokenKind, TokenValue};
use crate::domain::foundation::{DomainError, ErrorCode, OrderId, Timestamp};
use crate::ports::{ConsumeResult, DownloadTokenRepository};

/// Token store guarded by one async mutex.
///
/// `consume` checks and increments under the same guard, which gives the
/// same guarantee as the conditional `UPDATE` of the SQL adapter.
#[derive(Default)]
pub struct InMemoryDownloadTokenRepository {
    tokens: Mutex<HashMap<TokenValue, DownloadToken>>,
}

impl InMemoryDownloadTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tokens.
    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }
}

fn ensure_unique(
    tokens: &HashMap<TokenValue, DownloadToken>,
    token: &DownloadToken,
) -> Result<(), DomainError> {
    if tokens.contains_key(&token.token) {
        return Err(DomainError::new(
            ErrorCode::ConcurrencyConflict,
            "Token value already exists",
        ));
    }
    Ok(())
}

#[async_trait]
impl DownloadTokenRepository for InMemoryDownloadTokenRepository {
    async fn insert(&self, token: &DownloadToken) -> Result<(), DomainError> {
        let mut tokens = self.tokens.lock().await;
        ensure_unique(&tokens, token)?;
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn insert_initial_if_absent(
        &self,
        token: &DownloadToken,
    ) -> Result<(DownloadToken, bool), DomainError> {
        let mut tokens = self.tokens.lock().await;
        let existing = tokens
            .values()
            .find(|t| t.order_id == token.order_id && t.kind == TokenKind::Initial);
        if let Some(existing) = existing {
            return Ok((existing.clone(), false));
        }

        ensure_unique(&tokens, token)?;
        let mut initial = token.clone();
        initial.kind = TokenKind::Initial;
        tokens.insert(initial.token.clone(), initial.clone());
        Ok((initial, true))
    }

    async fn consume(
        &self,
        token: &TokenValue,
        now: Timestamp,
    ) -> Result<ConsumeResult, DomainError> {
        let mut tokens = self.tokens.lock().await;
        let Some(stored) = tokens.get_mut(token) else {
            return Ok(ConsumeResult::Denied(DenialReason::NotFound));
        };
        match stored.consume(now) {
            Ok(()) => Ok(ConsumeResult::Consumed(stored.clone())),
            Err(reason) => Ok(ConsumeResult::Denied(reason)),
        }
    }

    async fn revoke(&self, token: &TokenValue) -> Result<bool, DomainError> {
        let mut tokens = self.tokens.lock().await;
        match tokens.get_mut(token) {
            Some(stored) => {
                stored.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_token(
        &self,
        token: &TokenValue,
    ) -> Result<Option<DownloadToken>, DomainError> {
        Ok(self.tokens.lock().await.get(token).cloned())
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<DownloadToken>, DomainError> {
        let tokens = self.tokens.lock().await;
        let mut found: Vec<DownloadToken> = tokens
            .values()
            .filter(|t| t.order_id == *order_id)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }
}
