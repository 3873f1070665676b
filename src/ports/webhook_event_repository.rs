//! WebhookEventRepository port - durable ledger of inbound payment events.
//!
//! The processor event id is the sole deduplication key. Processors deliver
//! at least once, so the same event id may arrive many times, possibly
//! concurrently. `record_if_new` must be atomic on the event id
//! (`ON CONFLICT DO NOTHING` or equivalent).
//!
//! The record also tracks the processing outcome so a stored but failed
//! event can be replayed without losing its place in the dedup ledger.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId, Timestamp};

/// Where a stored event is in its processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingState {
    /// Stored, dispatch not yet finished (in flight or crashed).
    Pending,
    /// Dispatch finished; redeliveries are duplicates.
    Processed,
    /// Dispatch failed; eligible for replay.
    Failed,
    /// Dispatch failed permanently (bad payload, illegal transition).
    /// Redeliveries are duplicates.
    Rejected,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "pending",
            ProcessingState::Processed => "processed",
            ProcessingState::Failed => "failed",
            ProcessingState::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProcessingState::Pending),
            "processed" => Some(ProcessingState::Processed),
            "failed" => Some(ProcessingState::Failed),
            "rejected" => Some(ProcessingState::Rejected),
            _ => None,
        }
    }

    /// True for outcomes that are never dispatched again. Reaching one
    /// stamps `processed_at`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Processed | ProcessingState::Rejected)
    }
}

/// A received processor notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEventRecord {
    /// Processor event id (`evt_...`).
    pub event_id: EventId,

    /// Processor event type (e.g. `checkout.session.completed`).
    pub event_type: String,

    /// Raw payload as received.
    pub payload: Vec<u8>,

    pub received_at: Timestamp,

    pub processing: ProcessingState,

    /// Number of dispatch attempts started.
    pub attempts: u32,

    /// When the latest dispatch attempt started.
    pub last_attempt_at: Timestamp,

    /// Error of the latest failed attempt.
    pub error_message: Option<String>,

    /// When the record reached a terminal state.
    pub processed_at: Option<Timestamp>,
}

impl WebhookEventRecord {
    /// Creates a record for a freshly received event, already claimed for
    /// its first dispatch attempt.
    pub fn received(
        event_id: EventId,
        event_type: impl Into<String>,
        payload: Vec<u8>,
        now: Timestamp,
    ) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            payload,
            received_at: now,
            processing: ProcessingState::Pending,
            attempts: 1,
            last_attempt_at: now,
            error_message: None,
            processed_at: None,
        }
    }

    /// Returns true if a dispatch attempt may start on this record now.
    ///
    /// Failed records are always eligible. Pending records are eligible once
    /// their latest attempt started before `stale_before`.
    pub fn is_replayable(&self, stale_before: Timestamp) -> bool {
        match self.processing {
            ProcessingState::Failed => true,
            ProcessingState::Pending => self.last_attempt_at.is_before(&stale_before),
            ProcessingState::Processed | ProcessingState::Rejected => false,
        }
    }
}

/// Result of `record_if_new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// True if this call inserted the record.
    pub is_new: bool,
    /// The stored record (the existing one when `is_new` is false).
    pub record: WebhookEventRecord,
}

/// Port for the payment event ledger.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Inserts the record unless its event id is already stored.
    ///
    /// An existing record is returned unchanged with `is_new = false`.
    async fn record_if_new(&self, record: WebhookEventRecord)
        -> Result<RecordOutcome, DomainError>;

    /// Atomically claims a stored record for another dispatch attempt.
    ///
    /// Succeeds only if the record is replayable at `stale_before`
    /// (see [`WebhookEventRecord::is_replayable`]); the claim sets it back to
    /// pending, bumps `attempts` and stamps `last_attempt_at = now`.
    /// Returns `None` if the record is missing or not replayable, which
    /// includes losing the claim to a concurrent caller.
    async fn claim_for_retry(
        &self,
        event_id: &EventId,
        stale_before: Timestamp,
        now: Timestamp,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Marks dispatch finished.
    async fn mark_processed(&self, event_id: &EventId, at: Timestamp) -> Result<(), DomainError>;

    /// Marks dispatch failed with the given error. The record stays
    /// replayable.
    async fn mark_failed(
        &self,
        event_id: &EventId,
        error: &str,
        at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Marks dispatch permanently failed with the given error.
    async fn mark_rejected(
        &self,
        event_id: &EventId,
        error: &str,
        at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Finds a stored event.
    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Lists records replayable at `stale_before`, oldest first.
    async fn find_replayable(
        &self,
        stale_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookEventRecord>, DomainError>;
}
