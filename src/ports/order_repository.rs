//! Order repository port.
//!
//! Defines the persistence contract of the order ledger. Status changes go
//! through a single compare-and-set on the current status so each
//! transition is linearizable per order without any in-process lock.
//!
//! # Example
//!
//! ```ignore
//! async fn complete(repo: &dyn OrderRepository, session: &SessionId) -> Result<bool, DomainError> {
//!     let flipped = repo
//!         .compare_and_set_status(
//!             session,
//!             OrderStatus::Pending,
//!             OrderTransition::Complete,
//!             Some("pi_123"),
//!             Timestamp::now(),
//!         )
//!         .await?;
//!     Ok(flipped.is_some())
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, SessionId, Timestamp};
use crate::domain::orders::{Order, OrderStatus, OrderTransition};

/// Repository port for the order ledger.
///
/// Implementations must ensure:
/// - Unique `session_id`
/// - Orders are never deleted
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts `order` unless an order for its session already exists.
    ///
    /// Returns the stored order and whether this call created it. An
    /// existing order is returned unchanged.
    async fn insert_if_absent(&self, order: &Order) -> Result<(Order, bool), DomainError>;

    /// Applies `transition` only if the order is currently in `expected`.
    ///
    /// `payment_intent_id`, when given, is recorded in the same update.
    /// Returns the updated order, or `None` when no order for the session is
    /// in `expected` (missing, or another writer moved it first).
    async fn compare_and_set_status(
        &self,
        session_id: &SessionId,
        expected: OrderStatus,
        transition: OrderTransition,
        payment_intent_id: Option<&str>,
        at: Timestamp,
    ) -> Result<Option<Order>, DomainError>;

    /// Find an order by its ID.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Find the order created for a checkout session.
    async fn find_by_session_id(&self, session_id: &SessionId)
        -> Result<Option<Order>, DomainError>;

    /// Find the order paid by a payment intent.
    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, DomainError>;
}
