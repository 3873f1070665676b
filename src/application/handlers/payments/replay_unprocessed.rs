//! ReplayUnprocessedHandler - re-runs stored events whose processing did not
//! finish.
//!
//! Picks up failed records and pending records whose last attempt started
//! before the grace window (a crash mid-dispatch). Each record is claimed
//! before dispatch, so a concurrent redelivery of the same event cannot run
//! it twice.

use std::sync::Arc;

use chrono::Duration;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::WebhookEventRepository;

use super::HandlePaymentEventHandler;

/// Command to replay unprocessed events.
#[derive(Debug, Clone, Copy)]
pub struct ReplayUnprocessedCommand {
    /// Maximum records to replay in this run.
    pub limit: u32,
}

impl Default for ReplayUnprocessedCommand {
    fn default() -> Self {
        Self { limit: 100 }
    }
}

/// Counts for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayUnprocessedResult {
    /// Records dispatched successfully.
    pub processed: u32,
    /// Records whose dispatch failed again.
    pub failed: u32,
    /// Records claimed by someone else first.
    pub skipped: u32,
}

pub struct ReplayUnprocessedHandler {
    events: Arc<dyn WebhookEventRepository>,
    engine: Arc<HandlePaymentEventHandler>,
    replay_grace: Duration,
}

impl ReplayUnprocessedHandler {
    pub fn new(
        events: Arc<dyn WebhookEventRepository>,
        engine: Arc<HandlePaymentEventHandler>,
        replay_grace: Duration,
    ) -> Self {
        Self {
            events,
            engine,
            replay_grace,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReplayUnprocessedCommand,
    ) -> Result<ReplayUnprocessedResult, DomainError> {
        let now = Timestamp::now();
        let stale_before = now.minus(self.replay_grace);
        let candidates = self.events.find_replayable(stale_before, cmd.limit).await?;

        let mut result = ReplayUnprocessedResult::default();
        for candidate in candidates {
            let claimed = self
                .events
                .claim_for_retry(&candidate.event_id, stale_before, now)
                .await?;
            let Some(record) = claimed else {
                result.skipped += 1;
                continue;
            };

            match self.engine.process(record, true).await {
                Ok(_) => result.processed += 1,
                Err(_) => result.failed += 1,
            }
        }

        if result != ReplayUnprocessedResult::default() {
            tracing::info!(
                processed = result.processed,
                failed = result.failed,
                skipped = result.skipped,
                "Event replay finished"
            );
        }
        Ok(result)
    }
}
