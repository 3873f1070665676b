//! In-memory order ledger.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, SessionId, Timestamp};
use crate::domain::orders::{Order, OrderStatus, OrderTransition};
use crate::ports::OrderRepository;

/// Order ledger keyed by checkout session.
///
/// Every operation takes the single write lock, so the status check and the
/// update of `compare_and_set_status` are one atomic step.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<SessionId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert_if_absent(&self, order: &Order) -> Result<(Order, bool), DomainError> {
        let mut orders = self.orders.write().await;
        if let Some(existing) = orders.get(&order.session_id) {
            return Ok((existing.clone(), false));
        }
        orders.insert(order.session_id.clone(), order.clone());
        Ok((order.clone(), true))
    }

    async fn compare_and_set_status(
        &self,
        session_id: &SessionId,
        expected: OrderStatus,
        transition: OrderTransition,
        payment_intent_id: Option<&str>,
        at: Timestamp,
    ) -> Result<Option<Order>, DomainError> {
        let mut orders = self.orders.write().await;
        let order = match orders.get_mut(session_id) {
            Some(order) if order.status == expected => order,
            _ => return Ok(None),
        };

        let next = expected.apply(transition).map_err(|e| {
            DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
        })?;
        order.status = next;
        if let Some(intent) = payment_intent_id {
            order.payment_intent_id = Some(intent.to_string());
        }
        order.updated_at = at;
        Ok(Some(order.clone()))
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let orders = self.orders.read().await;
        Ok(orders.values().find(|o| o.id == *id).cloned())
    }

    async fn find_by_session_id(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.read().await.get(session_id).cloned())
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.payment_intent_id.as_deref() == Some(payment_intent_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ProductId;

    fn order(session: &str) -> Order {
        Order::pending(
            SessionId::new(session).unwrap(),
            ProductId::new("p1").unwrap(),
            "a@b.com",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_first_order() {
        let repo = InMemoryOrderRepository::new();
        let first = order("cs_1");
        let second = order("cs_1");

        let (stored, created) = repo.insert_if_absent(&first).await.unwrap();
        assert!(created);
        assert_eq!(stored.id, first.id);

        let (stored, created) = repo.insert_if_absent(&second).await.unwrap();
        assert!(!created);
        assert_eq!(stored.id, first.id);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn compare_and_set_applies_once() {
        let repo = InMemoryOrderRepository::new();
        let order = order("cs_1");
        repo.insert_if_absent(&order).await.unwrap();

        let first = repo
            .compare_and_set_status(
                &order.session_id,
                OrderStatus::Pending,
                OrderTransition::Complete,
                Some("pi_1"),
                Timestamp::now(),
            )
            .await
            .unwrap();
        let second = repo
            .compare_and_set_status(
                &order.session_id,
                OrderStatus::Pending,
                OrderTransition::Complete,
                Some("pi_1"),
                Timestamp::now(),
            )
            .await
            .unwrap();

        let updated = first.unwrap();
        assert_eq!(updated.status, OrderStatus::Completed);
        assert_eq!(updated.payment_intent_id.as_deref(), Some("pi_1"));
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn compare_and_set_on_missing_session_is_none() {
        let repo = InMemoryOrderRepository::new();
        let result = repo
            .compare_and_set_status(
                &SessionId::new("cs_missing").unwrap(),
                OrderStatus::Pending,
                OrderTransition::Cancel,
                None,
                Timestamp::now(),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn finds_by_payment_intent() {
        let repo = InMemoryOrderRepository::new();
        let order = order("cs_1");
        repo.insert_if_absent(&order).await.unwrap();
        repo.compare_and_set_status(
            &order.session_id,
            OrderStatus::Pending,
            OrderTransition::Complete,
            Some("pi_7"),
            Timestamp::now(),
        )
        .await
        .unwrap();

        let found = repo.find_by_payment_intent("pi_7").await.unwrap();
        assert_eq!(found.map(|o| o.id), Some(order.id));
        assert!(repo.find_by_payment_intent("pi_8").await.unwrap().is_none());
    }
}
