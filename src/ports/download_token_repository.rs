//! Download token repository port.
//!
//! Redemption is a single conditional increment: the usability check and the
//! `download_count + 1` happen in one atomic step, so concurrent redemptions
//! of a token with one download left yield exactly one success.

use async_trait::async_trait;

use crate::domain::delivery::{DenialReason, DownloadToken, TokenValue};
use crate::domain::foundation::{DomainError, OrderId, Timestamp};

/// Result of an atomic redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeResult {
    /// The count was incremented. Carries the post-image.
    Consumed(DownloadToken),
    /// The token was not usable; nothing changed.
    Denied(DenialReason),
}

/// Repository port for download tokens.
///
/// Implementations must ensure:
/// - Unique token values
/// - At most one `Initial` token per order
/// - `download_count <= max_downloads` at all times
#[async_trait]
pub trait DownloadTokenRepository: Send + Sync {
    /// Persists a new token.
    async fn insert(&self, token: &DownloadToken) -> Result<(), DomainError>;

    /// Persists `token` as the order's initial token unless one exists.
    ///
    /// Returns the stored initial token and whether this call created it.
    async fn insert_initial_if_absent(
        &self,
        token: &DownloadToken,
    ) -> Result<(DownloadToken, bool), DomainError>;

    /// Atomically checks usability at `now` and records one download.
    async fn consume(&self, token: &TokenValue, now: Timestamp)
        -> Result<ConsumeResult, DomainError>;

    /// Sets the revoked flag.
    ///
    /// Returns false only if no such token exists. Revoking twice is fine.
    async fn revoke(&self, token: &TokenValue) -> Result<bool, DomainError>;

    async fn find_by_token(&self, token: &TokenValue)
        -> Result<Option<DownloadToken>, DomainError>;

    /// Lists every token of an order, oldest first.
    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<DownloadToken>, DomainError>;
}
