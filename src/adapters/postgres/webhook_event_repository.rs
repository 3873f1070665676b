//! PostgreSQL implementation of WebhookEventRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, EventId, Timestamp};
use crate::ports::{
    ProcessingState, RecordOutcome, WebhookEventRecord, WebhookEventRepository,
};

const EVENT_COLUMNS: &str = "event_id, event_type, payload, received_at, processing, attempts, \
     last_attempt_at, error_message, processed_at";

/// PostgreSQL implementation of the WebhookEventRepository port.
pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    payload: Vec<u8>,
    received_at: DateTime<Utc>,
    processing: String,
    attempts: i32,
    last_attempt_at: DateTime<Utc>,
    error_message: Option<String>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let processing = ProcessingState::parse(&row.processing).ok_or_else(|| {
            DomainError::database(format!("Invalid processing state: {}", row.processing))
        })?;
        let event_id = EventId::new(row.event_id)
            .map_err(|e| DomainError::database(format!("Invalid event_id: {}", e)))?;
        let attempts = u32::try_from(row.attempts)
            .map_err(|_| DomainError::database(format!("Negative attempts: {}", row.attempts)))?;

        Ok(WebhookEventRecord {
            event_id,
            event_type: row.event_type,
            payload: row.payload,
            received_at: Timestamp::from_datetime(row.received_at),
            processing,
            attempts,
            last_attempt_at: Timestamp::from_datetime(row.last_attempt_at),
            error_message: row.error_message,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
        })
    }
}

fn query_failed(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

/// `processed_at` to write for an outcome; `None` leaves the column as is.
fn outcome_timestamp(state: ProcessingState, at: Timestamp) -> Option<DateTime<Utc>> {
    state.is_terminal().then_some(*at.as_datetime())
}

impl PostgresWebhookEventRepository {
    async fn set_outcome(
        &self,
        event_id: &EventId,
        state: ProcessingState,
        error: Option<&str>,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE webhook_events SET
                processing = $2,
                error_message = $3,
                processed_at = COALESCE($4, processed_at)
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_str())
        .bind(state.as_str())
        .bind(error)
        .bind(outcome_timestamp(state, at))
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update webhook event", e))?;

        Ok(())
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn record_if_new(
        &self,
        record: WebhookEventRecord,
    ) -> Result<RecordOutcome, DomainError> {
        let attempts = i32::try_from(record.attempts)
            .map_err(|_| DomainError::validation("attempts", "attempts is too large"))?;

        let inserted: Option<WebhookEventRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, payload, received_at, processing,
                attempts, last_attempt_at, error_message, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (event_id) DO NOTHING
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(record.event_id.as_str())
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.received_at.as_datetime())
        .bind(record.processing.as_str())
        .bind(attempts)
        .bind(record.last_attempt_at.as_datetime())
        .bind(&record.error_message)
        .bind(record.processed_at.map(|t| *t.as_datetime()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("record webhook event", e))?;

        if let Some(row) = inserted {
            return Ok(RecordOutcome {
                is_new: true,
                record: row.try_into()?,
            });
        }

        let existing = self.find_by_event_id(&record.event_id).await?.ok_or_else(|| {
            DomainError::database("Webhook event conflicted on insert but could not be read back")
        })?;
        Ok(RecordOutcome {
            is_new: false,
            record: existing,
        })
    }

    async fn claim_for_retry(
        &self,
        event_id: &EventId,
        stale_before: Timestamp,
        now: Timestamp,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(&format!(
            r#"
            UPDATE webhook_events SET
                processing = 'pending',
                attempts = attempts + 1,
                last_attempt_at = $3
            WHERE event_id = $1
              AND (processing = 'failed'
                   OR (processing = 'pending' AND last_attempt_at < $2))
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event_id.as_str())
        .bind(stale_before.as_datetime())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("claim webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }

    async fn mark_processed(&self, event_id: &EventId, at: Timestamp) -> Result<(), DomainError> {
        self.set_outcome(event_id, ProcessingState::Processed, None, at)
            .await
    }

    async fn mark_failed(
        &self,
        event_id: &EventId,
        error: &str,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.set_outcome(event_id, ProcessingState::Failed, Some(error), at)
            .await
    }

    async fn mark_rejected(
        &self,
        event_id: &EventId,
        error: &str,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.set_outcome(event_id, ProcessingState::Rejected, Some(error), at)
            .await
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events WHERE event_id = $1",
            EVENT_COLUMNS
        ))
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }

    async fn find_replayable(
        &self,
        stale_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookEventRecord>, DomainError> {
        let rows: Vec<WebhookEventRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM webhook_events
            WHERE processing = 'failed'
               OR (processing = 'pending' AND last_attempt_at < $1)
            ORDER BY received_at
            LIMIT $2
            "#,
            EVENT_COLUMNS
        ))
        .bind(stale_before.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list replayable webhook events", e))?;

        rows.into_iter().map(WebhookEventRecord::try_from).collect()
    }
}
