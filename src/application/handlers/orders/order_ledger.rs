//! OrderLedger - status transitions of the order ledger.
//!
//! Every transition is one compare-and-set against the stored status. When
//! the set loses (the order was not in the expected status) the ledger
//! reloads the order to decide between an absorbed repeat and a rejected
//! transition.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, ProductId, SessionId, Timestamp};
use crate::domain::orders::{Order, OrderError, OrderStatus, OrderTransition};
use crate::ports::OrderRepository;

/// Result of `mark_completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub order: Order,
    /// True only for the caller whose update flipped `Pending -> Completed`.
    pub transitioned: bool,
}

/// Order ledger operations over an `OrderRepository`.
#[derive(Clone)]
pub struct OrderLedger {
    repository: Arc<dyn OrderRepository>,
}

impl OrderLedger {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    /// Creates a pending order for an unseen session, or returns the
    /// existing one unchanged.
    pub async fn upsert_from_session(
        &self,
        session_id: &SessionId,
        product_id: &ProductId,
        buyer_email: &str,
    ) -> Result<Order, OrderError> {
        let candidate = Order::pending(session_id.clone(), product_id.clone(), buyer_email)?;
        let (order, _created) = self.repository.insert_if_absent(&candidate).await?;
        Ok(order)
    }

    /// Moves the order `Pending -> Completed`.
    ///
    /// A repeat for the payment intent that already completed the order is
    /// absorbed with `transitioned = false`.
    pub async fn mark_completed(
        &self,
        session_id: &SessionId,
        payment_intent_id: &str,
    ) -> Result<CompletionOutcome, OrderError> {
        let flipped = self
            .repository
            .compare_and_set_status(
                session_id,
                OrderStatus::Pending,
                OrderTransition::Complete,
                Some(payment_intent_id),
                Timestamp::now(),
            )
            .await?;

        if let Some(order) = flipped {
            return Ok(CompletionOutcome {
                order,
                transitioned: true,
            });
        }

        let current = self.load(session_id).await?;
        if current.completed_by(payment_intent_id) {
            return Ok(CompletionOutcome {
                order: current,
                transitioned: false,
            });
        }
        Err(rejection(&current, OrderTransition::Complete))
    }

    /// Moves the order `Completed -> Refunded`.
    pub async fn mark_refunded(&self, session_id: &SessionId) -> Result<Order, OrderError> {
        self.transition(session_id, OrderTransition::Refund).await
    }

    /// Moves the order `Pending -> Cancelled`.
    pub async fn mark_cancelled(&self, session_id: &SessionId) -> Result<Order, OrderError> {
        self.transition(session_id, OrderTransition::Cancel).await
    }

    pub async fn find_by_session_id(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Order>, OrderError> {
        Ok(self.repository.find_by_session_id(session_id).await?)
    }

    pub async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, OrderError> {
        Ok(self.repository.find_by_payment_intent(payment_intent_id).await?)
    }

    async fn transition(
        &self,
        session_id: &SessionId,
        transition: OrderTransition,
    ) -> Result<Order, OrderError> {
        let updated = self
            .repository
            .compare_and_set_status(
                session_id,
                transition.required_status(),
                transition,
                None,
                Timestamp::now(),
            )
            .await?;

        match updated {
            Some(order) => Ok(order),
            None => {
                let current = self.load(session_id).await?;
                Err(rejection(&current, transition))
            }
        }
    }

    async fn load(&self, session_id: &SessionId) -> Result<Order, OrderError> {
        self.repository
            .find_by_session_id(session_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(session_id.clone()))
    }
}

/// Explains why a compare-and-set found the order in the wrong status.
fn rejection(current: &Order, transition: OrderTransition) -> OrderError {
    match current.status.apply(transition) {
        Err(err) => err,
        // The stored status allows the move, so the set lost to a writer that
        // has since moved the order back. Statuses never regress, so this
        // only happens with a misbehaving store.
        Ok(_) => OrderError::Persistence(DomainError::new(
            ErrorCode::ConcurrencyConflict,
            format!("Order status changed during {}", transition),
        )),
    }
}
