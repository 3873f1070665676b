//! Delivery gateway errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, ProductId, SessionId};
use crate::domain::orders::OrderStatus;

/// Failures of a download request other than a denied token.
///
/// Denials are ordinary outcomes and travel as `DenialReason`, not here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The token was consumed but its order's product could not be resolved.
    #[error("Product {product_id} for order {order_id} is unavailable")]
    ProductUnavailable {
        order_id: OrderId,
        product_id: ProductId,
    },

    /// The token's order disappeared between consume and lookup.
    #[error("Order {0} is missing")]
    OrderMissing(OrderId),

    /// No order exists for the checkout session.
    #[error("No order for checkout session {0}")]
    OrderNotFound(SessionId),

    /// The order does not currently entitle its buyer to downloads.
    #[error("Order {order_id} is {status}, not completed")]
    NotPaid {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A storage collaborator failed.
    #[error("Delivery storage failed: {0}")]
    Persistence(#[from] DomainError),
}

impl DeliveryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DeliveryError::ProductUnavailable { .. } => ErrorCode::ProductNotFound,
            DeliveryError::OrderMissing(_) | DeliveryError::OrderNotFound(_) => {
                ErrorCode::OrderNotFound
            }
            DeliveryError::NotPaid { .. } => ErrorCode::InvalidStateTransition,
            DeliveryError::Persistence(err) => err.code,
        }
    }

    /// Returns true if the caller may retry the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Persistence(err) if err.is_transient())
    }
}
