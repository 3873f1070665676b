//! Reconciliation error types.
//!
//! Defines the failure conditions of processing one payment event, with
//! retryability semantics for the caller's redelivery loop.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::orders::{OrderError, OrderStatus, OrderTransition};

/// Errors that occur while reconciling a payment event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// Payload was not valid JSON or did not match the expected object shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Required field missing from the event object.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The event asks for a status move the ledger does not allow.
    #[error("Cannot {transition} an order that is {from}")]
    InvalidTransition {
        from: OrderStatus,
        transition: OrderTransition,
    },

    /// The event references an order the ledger has never seen.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// A storage collaborator failed.
    #[error("Persistence failure: {0}")]
    Persistence(DomainError),
}

impl ReconciliationError {
    /// Returns true if redelivering the same event may succeed.
    ///
    /// Reapplying an event id is always safe; only storage failures are
    /// worth the retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconciliationError::Persistence(_))
    }

    /// Returns true if the stored event should stay eligible for replay.
    ///
    /// A refund may arrive before the completion it refers to, so a missing
    /// order is replayable as well as any storage failure.
    pub fn is_replayable(&self) -> bool {
        matches!(
            self,
            ReconciliationError::Persistence(_) | ReconciliationError::OrderNotFound(_)
        )
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ReconciliationError::MalformedPayload(_) | ReconciliationError::MissingField(_) => {
                ErrorCode::ValidationFailed
            }
            ReconciliationError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            ReconciliationError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            ReconciliationError::Persistence(err) => err.code,
        }
    }
}

impl From<DomainError> for ReconciliationError {
    fn from(err: DomainError) -> Self {
        ReconciliationError::Persistence(err)
    }
}

impl From<OrderError> for ReconciliationError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { from, transition } => {
                ReconciliationError::InvalidTransition { from, transition }
            }
            OrderError::Invalid(err) => ReconciliationError::MalformedPayload(err.to_string()),
            OrderError::NotFound(session_id) => {
                ReconciliationError::OrderNotFound(session_id.to_string())
            }
            OrderError::Persistence(err) => ReconciliationError::Persistence(err),
        }
    }
}
