//! Order aggregate entity.
//!
//! One order per checkout session. Orders are never deleted; a refunded or
//! cancelled order stays in the ledger as the audit trail of the purchase.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, ProductId, SessionId, Timestamp, ValidationError};

use super::{OrderError, OrderStatus, OrderTransition};

/// A purchase attempt.
///
/// # Invariants
///
/// - `session_id` is unique across the ledger
/// - `status` only moves along `OrderStatus::apply`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    /// Processor checkout session this order was created from.
    pub session_id: SessionId,

    /// Processor payment intent, known once payment is confirmed.
    pub payment_intent_id: Option<String>,

    pub buyer_email: String,

    pub product_id: ProductId,

    pub status: OrderStatus,

    /// When the checkout was first seen.
    pub purchased_at: Timestamp,

    pub updated_at: Timestamp,
}

impl Order {
    /// Creates a new pending order for a checkout session.
    pub fn pending(
        session_id: SessionId,
        product_id: ProductId,
        buyer_email: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let buyer_email = normalize_email(buyer_email.into())?;
        let now = Timestamp::now();
        Ok(Self {
            id: OrderId::new(),
            session_id,
            payment_intent_id: None,
            buyer_email,
            product_id,
            status: OrderStatus::Pending,
            purchased_at: now,
            updated_at: now,
        })
    }

    /// Returns true if this order currently entitles the buyer to downloads.
    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Completed
    }

    /// Returns true if a repeated completion with this payment intent is
    /// the same payment that already completed the order.
    pub fn completed_by(&self, payment_intent_id: &str) -> bool {
        self.status == OrderStatus::Completed
            && self.payment_intent_id.as_deref() == Some(payment_intent_id)
    }

    /// Applies a transition in memory.
    ///
    /// Adapters use this to compute the post-image of a conditional update.
    pub fn apply(
        &mut self,
        transition: OrderTransition,
        payment_intent_id: Option<&str>,
    ) -> Result<(), OrderError> {
        self.status = self.status.apply(transition)?;
        if let Some(intent) = payment_intent_id {
            self.payment_intent_id = Some(intent.to_string());
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

fn normalize_email(email: String) -> Result<String, ValidationError> {
    let email = email.trim().to_string();
    if email.is_empty() {
        return Err(ValidationError::empty_field("buyer_email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::invalid_format(
            "buyer_email",
            "expected local@domain",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_order() -> Order {
        Order::pending(
            SessionId::new("cs_1").unwrap(),
            ProductId::new("p1").unwrap(),
            "a@b.com",
        )
        .unwrap()
    }

    #[test]
    fn pending_order_starts_unpaid() {
        let order = pending_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.payment_intent_id.is_none());
        assert!(!order.is_paid());
    }

    #[test]
    fn pending_rejects_missing_email() {
        let result = Order::pending(
            SessionId::new("cs_1").unwrap(),
            ProductId::new("p1").unwrap(),
            "  ",
        );
        assert_eq!(result, Err(ValidationError::empty_field("buyer_email")));
    }

    #[test]
    fn pending_rejects_malformed_email() {
        let result = Order::pending(
            SessionId::new("cs_1").unwrap(),
            ProductId::new("p1").unwrap(),
            "not-an-email",
        );
        assert!(result.is_err());
    }

    #[test]
    fn apply_complete_records_payment_intent() {
        let mut order = pending_order();
        order.apply(OrderTransition::Complete, Some("pi_1")).unwrap();

        assert!(order.is_paid());
        assert!(order.completed_by("pi_1"));
        assert!(!order.completed_by("pi_2"));
    }

    #[test]
    fn apply_invalid_transition_leaves_status_unchanged() {
        let mut order = pending_order();
        let result = order.apply(OrderTransition::Refund, None);

        assert!(result.is_err());
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
