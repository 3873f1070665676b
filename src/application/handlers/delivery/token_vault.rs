//! TokenVault - issuance, redemption and revocation of download tokens.

use std::sync::Arc;

use crate::domain::delivery::{
    DenialReason, DeliveryError, DownloadToken, TokenKind, TokenPolicy, TokenValue,
};
use crate::domain::foundation::{DomainError, OrderId, Timestamp};
use crate::domain::orders::Order;
use crate::ports::{ConsumeResult, DownloadTokenRepository, OrderRepository};

/// Outcome of `validate_and_consume`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// One download was recorded against `token`.
    Granted { token: DownloadToken, order: Order },
    /// Nothing was recorded.
    Denied(DenialReason),
}

impl ConsumeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ConsumeOutcome::Granted { .. })
    }

    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            ConsumeOutcome::Granted { .. } => None,
            ConsumeOutcome::Denied(reason) => Some(*reason),
        }
    }
}

/// Token vault operations.
#[derive(Clone)]
pub struct TokenVault {
    tokens: Arc<dyn DownloadTokenRepository>,
    orders: Arc<dyn OrderRepository>,
    policy: TokenPolicy,
}

impl TokenVault {
    pub fn new(
        tokens: Arc<dyn DownloadTokenRepository>,
        orders: Arc<dyn OrderRepository>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            tokens,
            orders,
            policy,
        }
    }

    /// Returns the default issuance policy.
    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Issues an additional token for `order_id` under the default policy.
    pub async fn issue(&self, order_id: OrderId) -> Result<DownloadToken, DomainError> {
        self.issue_with(order_id, self.policy).await
    }

    /// Issues an additional token for `order_id` under `policy`.
    pub async fn issue_with(
        &self,
        order_id: OrderId,
        policy: TokenPolicy,
    ) -> Result<DownloadToken, DomainError> {
        let token = DownloadToken::issue(order_id, TokenKind::Reissue, policy, Timestamp::now());
        self.tokens.insert(&token).await?;
        Ok(token)
    }

    /// Issues the order's initial token unless it already has one.
    ///
    /// Returns the initial token and whether this call created it.
    pub async fn issue_initial(
        &self,
        order_id: OrderId,
    ) -> Result<(DownloadToken, bool), DomainError> {
        let token =
            DownloadToken::issue(order_id, TokenKind::Initial, self.policy, Timestamp::now());
        self.tokens.insert_initial_if_absent(&token).await
    }

    /// Atomically checks the presented token and records one download.
    ///
    /// Strings that could never have been issued are `not_found` without a
    /// storage round-trip. A token whose order is no longer paid is denied as
    /// `revoked` even if the token row itself was not yet revoked.
    pub async fn validate_and_consume(
        &self,
        presented: &str,
    ) -> Result<ConsumeOutcome, DeliveryError> {
        let Some(value) = TokenValue::parse(presented) else {
            return Ok(ConsumeOutcome::Denied(DenialReason::NotFound));
        };

        let token = match self.tokens.consume(&value, Timestamp::now()).await? {
            ConsumeResult::Consumed(token) => token,
            ConsumeResult::Denied(reason) => return Ok(ConsumeOutcome::Denied(reason)),
        };

        let order = self
            .orders
            .find_by_id(&token.order_id)
            .await?
            .ok_or(DeliveryError::OrderMissing(token.order_id))?;

        if !order.is_paid() {
            tracing::warn!(
                order_id = %order.id,
                status = %order.status,
                "Download denied for unpaid order"
            );
            return Ok(ConsumeOutcome::Denied(DenialReason::Revoked));
        }

        Ok(ConsumeOutcome::Granted { token, order })
    }

    /// Revokes a token. Returns false if no such token exists.
    pub async fn revoke(&self, presented: &str) -> Result<bool, DomainError> {
        match TokenValue::parse(presented) {
            Some(value) => self.tokens.revoke(&value).await,
            None => Ok(false),
        }
    }

    /// Revokes every token of an order. Returns how many tokens it holds.
    pub async fn revoke_all_for_order(&self, order_id: &OrderId) -> Result<usize, DomainError> {
        let tokens = self.tokens.list_for_order(order_id).await?;
        for token in &tokens {
            self.tokens.revoke(&token.token).await?;
        }
        Ok(tokens.len())
    }

    /// Lists every token of an order, oldest first.
    pub async fn tokens_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<DownloadToken>, DomainError> {
        self.tokens.list_for_order(order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryDownloadTokenRepository, InMemoryOrderRepository};
    use crate::domain::foundation::{ProductId, SessionId};
    use crate::domain::orders::{OrderStatus, OrderTransition};
    use chrono::Duration;

    struct Fixture {
        vault: TokenVault,
        orders: Arc<InMemoryOrderRepository>,
        order: Order,
    }

    async fn fixture(max_downloads: u32) -> Fixture {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let order = Order::pending(
            SessionId::new("cs_1").unwrap(),
            ProductId::new("p1").unwrap(),
            "a@b.com",
        )
        .unwrap();
        orders.insert_if_absent(&order).await.unwrap();
        let order = orders
            .compare_and_set_status(
                &order.session_id,
                OrderStatus::Pending,
                OrderTransition::Complete,
                Some("pi_1"),
                Timestamp::now(),
            )
            .await
            .unwrap()
            .unwrap();

        let policy = TokenPolicy::new(Duration::hours(72), max_downloads).unwrap();
        let vault = TokenVault::new(
            Arc::new(InMemoryDownloadTokenRepository::new()),
            orders.clone(),
            policy,
        );
        Fixture {
            vault,
            orders,
            order,
        }
    }

    #[tokio::test]
    async fn issued_token_is_redeemable_until_exhausted() {
        let f = fixture(3).await;
        let token = f.vault.issue(f.order.id).await.unwrap();

        for _ in 0..3 {
            let outcome = f.vault.validate_and_consume(token.token.as_str()).await.unwrap();
            match outcome {
                ConsumeOutcome::Granted { order, .. } => assert_eq!(order.id, f.order.id),
                other => panic!("expected grant, got {:?}", other),
            }
        }

        let outcome = f.vault.validate_and_consume(token.token.as_str()).await.unwrap();
        assert_eq!(outcome.reason(), Some(DenialReason::Exhausted));
    }

    #[tokio::test]
    async fn garbage_token_is_not_found() {
        let f = fixture(3).await;

        let outcome = f.vault.validate_and_consume("../etc/passwd").await.unwrap();
        assert_eq!(outcome, ConsumeOutcome::Denied(DenialReason::NotFound));

        let outcome = f
            .vault
            .validate_and_consume(TokenValue::generate().as_str())
            .await
            .unwrap();
        assert_eq!(outcome, ConsumeOutcome::Denied(DenialReason::NotFound));
    }

    #[tokio::test]
    async fn issue_initial_is_exactly_once() {
        let f = fixture(3).await;

        let (first, created_first) = f.vault.issue_initial(f.order.id).await.unwrap();
        let (second, created_second) = f.vault.issue_initial(f.order.id).await.unwrap();

        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first.token, second.token);
        assert_eq!(first.kind, TokenKind::Initial);
    }

    #[tokio::test]
    async fn revoked_token_is_denied() {
        let f = fixture(3).await;
        let token = f.vault.issue(f.order.id).await.unwrap();

        assert!(f.vault.revoke(token.token.as_str()).await.unwrap());
        assert!(f.vault.revoke(token.token.as_str()).await.unwrap());

        let outcome = f.vault.validate_and_consume(token.token.as_str()).await.unwrap();
        assert_eq!(outcome.reason(), Some(DenialReason::Revoked));
    }

    #[tokio::test]
    async fn revoke_unknown_token_is_false() {
        let f = fixture(3).await;
        assert!(!f.vault.revoke("not a token").await.unwrap());
        assert!(!f.vault.revoke(TokenValue::generate().as_str()).await.unwrap());
    }

    #[tokio::test]
    async fn revoke_all_covers_every_token_of_the_order() {
        let f = fixture(3).await;
        f.vault.issue_initial(f.order.id).await.unwrap();
        f.vault.issue(f.order.id).await.unwrap();

        let revoked = f.vault.revoke_all_for_order(&f.order.id).await.unwrap();

        assert_eq!(revoked, 2);
        let tokens = f.vault.tokens_for_order(&f.order.id).await.unwrap();
        assert!(tokens.iter().all(|t| t.revoked));
    }

    #[tokio::test]
    async fn token_of_refunded_order_is_denied_before_revocation() {
        let f = fixture(3).await;
        let token = f.vault.issue(f.order.id).await.unwrap();
        f.orders
            .compare_and_set_status(
                &f.order.session_id,
                OrderStatus::Completed,
                OrderTransition::Refund,
                None,
                Timestamp::now(),
            )
            .await
            .unwrap()
            .unwrap();

        let outcome = f.vault.validate_and_consume(token.token.as_str()).await.unwrap();

        assert_eq!(outcome.reason(), Some(DenialReason::Revoked));
    }

    #[tokio::test]
    async fn expired_token_is_denied() {
        let f = fixture(3).await;
        let policy = TokenPolicy::new(Duration::milliseconds(1), 3).unwrap();
        let token = f.vault.issue_with(f.order.id, policy).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let outcome = f.vault.validate_and_consume(token.token.as_str()).await.unwrap();
        assert_eq!(outcome.reason(), Some(DenialReason::Expired));
    }
}
