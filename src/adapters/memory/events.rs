//! In-memory payment event ledger.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, Timestamp};
use crate::ports::{ProcessingState, RecordOutcome, WebhookEventRecord, WebhookEventRepository};

/// Event ledger keyed by processor event id.
#[derive(Default)]
pub struct InMemoryWebhookEventRepository {
    records: RwLock<HashMap<EventId, WebhookEventRecord>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored events.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn set_outcome(
        &self,
        event_id: &EventId,
        state: ProcessingState,
        error: Option<&str>,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(event_id)
            .ok_or_else(|| event_not_found(event_id))?;
        record.processing = state;
        record.error_message = error.map(str::to_string);
        if state.is_terminal() {
            record.processed_at = Some(at);
        }
        Ok(())
    }
}

fn event_not_found(event_id: &EventId) -> DomainError {
    DomainError::new(ErrorCode::EventNotFound, "Webhook event not found")
        .with_detail("event_id", event_id.as_str())
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn record_if_new(
        &self,
        record: WebhookEventRecord,
    ) -> Result<RecordOutcome, DomainError> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&record.event_id) {
            return Ok(RecordOutcome {
                is_new: false,
                record: existing.clone(),
            });
        }
        records.insert(record.event_id.clone(), record.clone());
        Ok(RecordOutcome {
            is_new: true,
            record,
        })
    }

    async fn claim_for_retry(
        &self,
        event_id: &EventId,
        stale_before: Timestamp,
        now: Timestamp,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let mut records = self.records.write().await;
        let record = match records.get_mut(event_id) {
            Some(record) if record.is_replayable(stale_before) => record,
            _ => return Ok(None),
        };
        record.processing = ProcessingState::Pending;
        record.attempts += 1;
        record.last_attempt_at = now;
        Ok(Some(record.clone()))
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
        Ok(self.records.read().await.get(event_id).cloned())
    }

    async fn find_replayable(
        &self,
        stale_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookEventRecord>, DomainError> {
        let records = self.records.read().await;
        let mut replayable: Vec<WebhookEventRecord> = records
            .values()
            .filter(|r| r.is_replayable(stale_before))
            .cloned()
            .collect();
        replayable.sort_by_key(|r| r.received_at);
        replayable.truncate(limit as usize);
        Ok(replayable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received(id: &str, at: Timestamp) -> WebhookEventRecord {
        WebhookEventRecord::received(
            EventId::new(id).unwrap(),
            "checkout.session.completed",
            b"{}".to_vec(),
            at,
        )
    }

    #[tokio::test]
    async fn second_record_of_same_event_is_not_new() {
        let repo = InMemoryWebhookEventRepository::new();
        let now = Timestamp::now();

        let first = repo.record_if_new(received("evt_1", now)).await.unwrap();
        let second = repo
            .record_if_new(received("evt_1", now.plus_secs(5)))
            .await
            .unwrap();

        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(second.record.received_at, now);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn failed_event_can_be_claimed_once() {
        let repo = InMemoryWebhookEventRepository::new();
        let now = Timestamp::now();
        let event_id = EventId::new("evt_1").unwrap();
        repo.record_if_new(received("evt_1", now)).await.unwrap();
        repo.mark_failed(&event_id, "db down", now).await.unwrap();

        let stale_before = now.minus_secs(300);
        let claimed = repo
            .claim_for_retry(&event_id, stale_before, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.processing, ProcessingState::Pending);
        assert_eq!(claimed.attempts, 2);

        let again = repo.claim_for_retry(&event_id, stale_before, now).await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn processed_event_cannot_be_claimed() {
        let repo = InMemoryWebhookEventRepository::new();
        let now = Timestamp::now();
        let event_id = EventId::new("evt_1").unwrap();
        repo.record_if_new(received("evt_1", now)).await.unwrap();
        repo.mark_processed(&event_id, now).await.unwrap();

        let claimed = repo
            .claim_for_retry(&event_id, now.plus_secs(1), now)
            .await
            .unwrap();
        assert!(claimed.is_none());

        let stored = repo.find_by_event_id(&event_id).await.unwrap().unwrap();
        assert_eq!(stored.processed_at, Some(now));
    }

    #[tokio::test]
    async fn replayable_lists_failed_and_stale_pending_oldest_first() {
        let repo = InMemoryWebhookEventRepository::new();
        let now = Timestamp::now();

        repo.record_if_new(received("evt_fresh", now)).await.unwrap();
        repo.record_if_new(received("evt_stale", now.minus_secs(600)))
            .await
            .unwrap();
        repo.record_if_new(received("evt_failed", now.minus_secs(900)))
            .await
            .unwrap();
        repo.mark_failed(&EventId::new("evt_failed").unwrap(), "boom", now)
            .await
            .unwrap();

        let replayable = repo
            .find_replayable(now.minus_secs(300), 10)
            .await
            .unwrap();
        let ids: Vec<&str> = replayable.iter().map(|r| r.event_id.as_str()).collect();

        assert_eq!(ids, vec!["evt_failed", "evt_stale"]);
    }

    #[tokio::test]
    async fn rejected_event_is_not_replayable() {
        let repo = InMemoryWebhookEventRepository::new();
        let now = Timestamp::now();
        let event_id = EventId::new("evt_1").unwrap();
        repo.record_if_new(received("evt_1", now.minus_secs(900)))
            .await
            .unwrap();
        repo.mark_rejected(&event_id, "missing field", now).await.unwrap();

        assert!(repo.find_replayable(now, 10).await.unwrap().is_empty());
        let stored = repo.find_by_event_id(&event_id).await.unwrap().unwrap();
        assert_eq!(stored.processing, ProcessingState::Rejected);
        assert_eq!(stored.error_message.as_deref(), Some("missing field"));
        assert_eq!(stored.processed_at, Some(now));
    }

    #[tokio::test]
    async fn failed_event_keeps_processed_at_unset() {
        let repo = InMemoryWebhookEventRepository::new();
        let now = Timestamp::now();
        let event_id = EventId::new("evt_1").unwrap();
        repo.record_if_new(received("evt_1", now)).await.unwrap();

        repo.mark_failed(&event_id, "connection reset", now).await.unwrap();

        let stored = repo.find_by_event_id(&event_id).await.unwrap().unwrap();
        assert_eq!(stored.processing, ProcessingState::Failed);
        assert!(stored.processed_at.is_none());
    }

    #[tokio::test]
    async fn marking_unknown_event_fails() {
        let repo = InMemoryWebhookEventRepository::new();
        let err = repo
            .mark_processed(&EventId::new("evt_missing").unwrap(), Timestamp::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EventNotFound);
    }
}
