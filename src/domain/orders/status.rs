//! Order status state machine.
//!
//! ```text
//! Pending ──complete──▶ Completed ──refund──▶ Refunded
//!    │
//!    └────cancel─────▶ Cancelled
//! ```
//!
//! `Refunded` and `Cancelled` are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

use super::OrderError;

/// Lifecycle status of an order.
///
/// The numeric codes are the persisted representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created from a checkout session, payment not yet confirmed.
    Pending,

    /// Payment confirmed; the buyer is entitled to download.
    Completed,

    /// Payment returned to the buyer. Terminal.
    Refunded,

    /// Checkout abandoned or expired before payment. Terminal.
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Completed,
        OrderStatus::Refunded,
        OrderStatus::Cancelled,
    ];

    /// Persisted numeric code.
    pub fn code(&self) -> i16 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Completed => 1,
            OrderStatus::Refunded => 2,
            OrderStatus::Cancelled => 3,
        }
    }

    /// Parses a persisted numeric code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::Pending),
            1 => Some(OrderStatus::Completed),
            2 => Some(OrderStatus::Refunded),
            3 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Applies a transition, returning the next status.
    ///
    /// This is the transition table of the order ledger. Every pair not listed
    /// here is rejected with `OrderError::InvalidTransition`, including a
    /// repeated `Complete` on an already completed order; absorbing duplicate
    /// payment events is the ledger's job, not the table's.
    pub fn apply(self, transition: OrderTransition) -> Result<OrderStatus, OrderError> {
        use OrderStatus::*;
        use OrderTransition::*;

        match (self, transition) {
            (Pending, Complete) => Ok(Completed),
            (Pending, Cancel) => Ok(Cancelled),
            (Completed, Refund) => Ok(Refunded),
            (from, transition) => Err(OrderError::InvalidTransition { from, transition }),
        }
    }
}

impl StateMachine for OrderStatus {
    type Transition = OrderTransition;

    fn transitions() -> &'static [OrderTransition] {
        &OrderTransition::ALL
    }

    fn step(&self, transition: OrderTransition) -> Option<Self> {
        self.apply(transition).ok()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// A requested movement through the order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTransition {
    Complete,
    Cancel,
    Refund,
}

impl OrderTransition {
    pub const ALL: [OrderTransition; 3] = [
        OrderTransition::Complete,
        OrderTransition::Cancel,
        OrderTransition::Refund,
    ];

    /// The only status this transition may start from.
    pub fn required_status(&self) -> OrderStatus {
        match self {
            OrderTransition::Complete | OrderTransition::Cancel => OrderStatus::Pending,
            OrderTransition::Refund => OrderStatus::Completed,
        }
    }
}

impl fmt::Display for OrderTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderTransition::Complete => "complete",
            OrderTransition::Cancel => "cancel",
            OrderTransition::Refund => "refund",
        };
        write!(f, "{}", s)
    }
}
