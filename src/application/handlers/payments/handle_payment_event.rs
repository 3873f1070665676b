//! HandlePaymentEventHandler - the reconciliation engine.
//!
//! Processes one verified processor event with exactly-once business effect
//! under at-least-once delivery:
//!
//! 1. Record the event id (dedup). A stored event is a duplicate unless it
//!    can be claimed for another attempt (failed, or pending past the grace
//!    window).
//! 2. Dispatch the stored payload to the order ledger.
//! 3. Issue the initial token when the completion actually flipped the
//!    order, or on a replayed attempt. A replayed refund finds the order
//!    already refunded and still revokes its tokens.
//! 4. Mark the record processed, failed (replayable) or rejected.

use std::sync::Arc;

use chrono::Duration;

use crate::domain::delivery::DownloadToken;
use crate::domain::foundation::{EventId, Timestamp};
use crate::domain::orders::{Order, OrderError, OrderStatus};
use crate::domain::payments::{
    CheckoutCompletion, PaymentAction, PaymentEvent, ReconciliationError, RefundReference,
};
use crate::ports::{DeliveryNotifier, TokenIssuedNotice, WebhookEventRecord, WebhookEventRepository};

use crate::application::handlers::delivery::TokenVault;
use crate::application::handlers::orders::OrderLedger;

/// Command to handle one processor event.
#[derive(Debug, Clone)]
pub struct HandlePaymentEventCommand {
    /// Processor event id.
    pub event_id: String,
    /// Processor event type.
    pub event_type: String,
    /// Raw payload, signature already verified.
    pub payload: Vec<u8>,
}

/// What happened to the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationStatus {
    /// Stored for audit; no ledger mutation.
    New,
    /// Already stored and processed (or in flight); nothing was done.
    Duplicate,
    /// Applied to the ledger, or absorbed as a repeat of an applied change.
    Processed,
}

/// Result of reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub status: ReconciliationStatus,
    /// The order the event applied to, if any.
    pub order: Option<Order>,
    /// Token created by this call, if any.
    pub issued_token: Option<DownloadToken>,
}

impl ReconciliationResult {
    fn duplicate() -> Self {
        Self {
            status: ReconciliationStatus::Duplicate,
            order: None,
            issued_token: None,
        }
    }

    fn recorded() -> Self {
        Self {
            status: ReconciliationStatus::New,
            order: None,
            issued_token: None,
        }
    }

    fn processed(order: Order, issued_token: Option<DownloadToken>) -> Self {
        Self {
            status: ReconciliationStatus::Processed,
            order: Some(order),
            issued_token,
        }
    }
}

/// Handler for processor events.
pub struct HandlePaymentEventHandler {
    events: Arc<dyn WebhookEventRepository>,
    ledger: OrderLedger,
    vault: TokenVault,
    notifier: Arc<dyn DeliveryNotifier>,
    replay_grace: Duration,
}

impl HandlePaymentEventHandler {
    pub fn new(
        events: Arc<dyn WebhookEventRepository>,
        ledger: OrderLedger,
        vault: TokenVault,
        notifier: Arc<dyn DeliveryNotifier>,
        replay_grace: Duration,
    ) -> Self {
        Self {
            events,
            ledger,
            vault,
            notifier,
            replay_grace,
        }
    }

    /// Single entry point for inbound events.
    pub async fn handle(
        &self,
        cmd: HandlePaymentEventCommand,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        let event_id =
            EventId::new(cmd.event_id).map_err(|_| ReconciliationError::MissingField("event_id"))?;
        let now = Timestamp::now();

        let record = WebhookEventRecord::received(event_id.clone(), cmd.event_type, cmd.payload, now);
        let outcome = self.events.record_if_new(record).await?;

        if outcome.is_new {
            return self.process(outcome.record, false).await;
        }

        let stale_before = now.minus(self.replay_grace);
        match self.events.claim_for_retry(&event_id, stale_before, now).await? {
            Some(record) => {
                tracing::info!(
                    event_id = %event_id,
                    attempt = record.attempts,
                    "Reprocessing stored event"
                );
                self.process(record, true).await
            }
            None => {
                tracing::debug!(event_id = %event_id, "Duplicate event skipped");
                Ok(ReconciliationResult::duplicate())
            }
        }
    }

    /// Runs dispatch for a record this caller has claimed and records the
    /// outcome on it.
    ///
    /// `replay` marks a repeated attempt: the initial token is then ensured
    /// even if the completion was applied by an earlier attempt.
    pub(crate) async fn process(
        &self,
        record: WebhookEventRecord,
        replay: bool,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        let event = PaymentEvent::new(record.event_id, record.event_type, record.payload);

        match self.dispatch(&event, replay).await {
            Ok(result) => {
                self.events.mark_processed(&event.id, Timestamp::now()).await?;
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    status = ?result.status,
                    token_issued = result.issued_token.is_some(),
                    "Payment event reconciled"
                );
                Ok(result)
            }
            Err(err) => {
                self.record_failure(&event, &err).await;
                Err(err)
            }
        }
    }

    async fn record_failure(&self, event: &PaymentEvent, err: &ReconciliationError) {
        let message = err.to_string();
        let now = Timestamp::now();
        let marked = if err.is_replayable() {
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                error = %err,
                "Payment event failed; kept for replay"
            );
            self.events.mark_failed(&event.id, &message, now).await
        } else {
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                error = %err,
                "Payment event rejected"
            );
            self.events.mark_rejected(&event.id, &message, now).await
        };

        // The record stays pending and becomes replayable after the grace window.
        if let Err(mark_err) = marked {
            tracing::error!(
                event_id = %event.id,
                error = %mark_err,
                "Failed to record event outcome"
            );
        }
    }

    async fn dispatch(
        &self,
        event: &PaymentEvent,
        replay: bool,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        match event.action()? {
            PaymentAction::CompleteCheckout(completion) => {
                self.complete_checkout(completion, replay).await
            }
            PaymentAction::CancelCheckout { session_id } => {
                if self.ledger.find_by_session_id(&session_id).await?.is_none() {
                    tracing::info!(
                        event_id = %event.id,
                        session_id = %session_id,
                        "Cancellation for unknown session recorded"
                    );
                    return Ok(ReconciliationResult::recorded());
                }
                let order = self.ledger.mark_cancelled(&session_id).await?;
                Ok(ReconciliationResult::processed(order, None))
            }
            PaymentAction::Refund(reference) => self.refund(reference, replay).await,
            PaymentAction::Ignore => {
                tracing::debug!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Unhandled event type recorded"
                );
                Ok(ReconciliationResult::recorded())
            }
        }
    }

    async fn complete_checkout(
        &self,
        completion: CheckoutCompletion,
        replay: bool,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        self.ledger
            .upsert_from_session(
                &completion.session_id,
                &completion.product_id,
                &completion.buyer_email,
            )
            .await?;

        let outcome = self
            .ledger
            .mark_completed(&completion.session_id, &completion.payment_intent_id)
            .await?;

        let issued_token = if outcome.transitioned || replay {
            self.ensure_initial_token(&outcome.order).await?
        } else {
            None
        };

        Ok(ReconciliationResult::processed(outcome.order, issued_token))
    }

    /// Creates the initial token unless the order already has one, and
    /// notifies the buyer when it was created here.
    async fn ensure_initial_token(
        &self,
        order: &Order,
    ) -> Result<Option<DownloadToken>, ReconciliationError> {
        let (token, created) = self.vault.issue_initial(order.id).await?;
        if !created {
            return Ok(None);
        }

        tracing::info!(order_id = %order.id, "Initial download token issued");

        let notice = TokenIssuedNotice {
            order_id: order.id,
            buyer_email: order.buyer_email.clone(),
            token: token.token.clone(),
            expires_at: token.expires_at,
        };
        if let Err(err) = self.notifier.token_issued(&notice).await {
            tracing::warn!(order_id = %order.id, error = %err, "Failed to notify buyer of issued token");
        }

        Ok(Some(token))
    }

    async fn refund(
        &self,
        reference: RefundReference,
        replay: bool,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        let session_id = match (reference.session_id, reference.payment_intent_id) {
            (Some(session_id), _) => session_id,
            (None, Some(intent)) => match self.ledger.find_by_payment_intent(&intent).await? {
                Some(order) => order.session_id,
                None => return Err(ReconciliationError::OrderNotFound(intent)),
            },
            (None, None) => return Err(ReconciliationError::MissingField("payment_intent")),
        };

        let order = match self.ledger.mark_refunded(&session_id).await {
            Ok(order) => order,
            // An earlier attempt of this event flipped the status and then
            // failed before revoking.
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Refunded,
                ..
            }) if replay => self
                .ledger
                .find_by_session_id(&session_id)
                .await?
                .ok_or_else(|| ReconciliationError::OrderNotFound(session_id.to_string()))?,
            Err(err) => return Err(err.into()),
        };
        let revoked = self.vault.revoke_all_for_order(&order.id).await?;
        tracing::info!(
            order_id = %order.id,
            session_id = %session_id,
            revoked_tokens = revoked,
            replay,
            "Order refunded"
        );

        Ok(ReconciliationResult::processed(order, None))
    }
}
