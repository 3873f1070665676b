//! PostgreSQL implementation of OrderRepository.
//!
//! Status transitions are a single conditional `UPDATE ... WHERE status =
//! $expected`, so concurrent writers cannot both apply the same move.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, ProductId, SessionId, Timestamp,
};
use crate::domain::orders::{Order, OrderStatus, OrderTransition};
use crate::ports::OrderRepository;

const ORDER_COLUMNS: &str =
    "id, session_id, payment_intent_id, buyer_email, product_id, status, purchased_at, updated_at";

/// PostgreSQL implementation of the OrderRepository port.
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    session_id: String,
    payment_intent_id: Option<String>,
    buyer_email: String,
    product_id: String,
    status: i16,
    purchased_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::from_code(row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid order status value: {}", row.status),
            )
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            session_id: SessionId::new(row.session_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid session_id: {}", e))
            })?,
            payment_intent_id: row.payment_intent_id,
            buyer_email: row.buyer_email,
            product_id: ProductId::new(row.product_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid product_id: {}", e))
            })?,
            status,
            purchased_at: Timestamp::from_datetime(row.purchased_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn query_failed(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert_if_absent(&self, order: &Order) -> Result<(Order, bool), DomainError> {
        let inserted: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO orders (
                id, session_id, payment_intent_id, buyer_email, product_id,
                status, purchased_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (session_id) DO NOTHING
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.id.as_uuid())
        .bind(order.session_id.as_str())
        .bind(&order.payment_intent_id)
        .bind(&order.buyer_email)
        .bind(order.product_id.as_str())
        .bind(order.status.code())
        .bind(order.purchased_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("insert order", e))?;

        if let Some(row) = inserted {
            return Ok((row.try_into()?, true));
        }

        let existing = self.find_by_session_id(&order.session_id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::ConcurrencyConflict,
                "Order conflicted on insert but could not be read back",
            )
        })?;
        Ok((existing, false))
    }

    async fn compare_and_set_status(
        &self,
        session_id: &SessionId,
        expected: OrderStatus,
        transition: OrderTransition,
        payment_intent_id: Option<&str>,
        at: Timestamp,
    ) -> Result<Option<Order>, DomainError> {
        let next = expected.apply(transition).map_err(|e| {
            DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
        })?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE orders SET
                status = $3,
                payment_intent_id = COALESCE($4, payment_intent_id),
                updated_at = $5
            WHERE session_id = $1 AND status = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(session_id.as_str())
        .bind(expected.code())
        .bind(next.code())
        .bind(payment_intent_id)
        .bind(at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("update order status", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_session_id(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE session_id = $1",
            ORDER_COLUMNS
        ))
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find order by session", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE payment_intent_id = $1 ORDER BY purchased_at LIMIT 1",
            ORDER_COLUMNS
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find order by payment intent", e))?;

        row.map(Order::try_from).transpose()
    }
}
