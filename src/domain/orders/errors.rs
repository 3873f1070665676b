//! Order ledger errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, ValidationError};

use super::{OrderStatus, OrderTransition};

/// Errors raised by order ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The state machine does not allow this move. Terminal for the call.
    #[error("Cannot {transition} an order that is {from}")]
    InvalidTransition {
        from: OrderStatus,
        transition: OrderTransition,
    },

    /// The order data failed validation.
    #[error("Invalid order: {0}")]
    Invalid(#[from] ValidationError),

    /// No order exists for the checkout session.
    #[error("No order for checkout session {0}")]
    NotFound(SessionId),

    /// The storage collaborator failed. Safe to retry.
    #[error("Order storage failed: {0}")]
    Persistence(#[from] DomainError),
}

impl OrderError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            OrderError::Invalid(_) => ErrorCode::ValidationFailed,
            OrderError::NotFound(_) => ErrorCode::OrderNotFound,
            OrderError::Persistence(err) => err.code,
        }
    }

    /// Returns true if repeating the whole call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::Persistence(err) if err.is_transient())
    }
}
