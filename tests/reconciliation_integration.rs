//! Integration tests for payment event reconciliation.
//!
//! Drives `HandlePaymentEventHandler` through the public `Storefront` wiring
//! against the in-memory adapters.

mod common;

use common::{completed, expired, harness, refunded, unknown};

use digital_storefront::application::{
    ReconciliationStatus, ReplayUnprocessedCommand, RequestDownloadCommand,
};
use digital_storefront::domain::delivery::{DenialReason, TokenKind};
use digital_storefront::domain::foundation::{EventId, SessionId};
use digital_storefront::domain::orders::OrderStatus;
use digital_storefront::domain::payments::ReconciliationError;
use digital_storefront::ports::{OrderRepository, ProcessingState, WebhookEventRepository};

fn session(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

fn event(id: &str) -> EventId {
    EventId::new(id).unwrap()
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[tokio::test]
async fn completed_checkout_creates_order_and_one_token() {
    let h = harness(3);

    let result = h
        .storefront
        .payment_events
        .handle(completed("evt_1", "cs_1", "pi_1"))
        .await
        .unwrap();

    assert_eq!(result.status, ReconciliationStatus::Processed);
    let order = h.orders.find_by_session_id(&session("cs_1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.payment_intent_id.as_deref(), Some("pi_1"));
    assert_eq!(order.buyer_email, "buyer@example.com");

    let token = result.issued_token.expect("initial token");
    assert_eq!(token.kind, TokenKind::Initial);
    assert_eq!(token.download_count, 0);
    assert_eq!(token.max_downloads, 3);
    assert_eq!(h.tokens.len().await, 1);

    let notices = h.notifier.notices().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].order_id, order.id);
}

#[tokio::test]
async fn token_redeems_three_times_then_is_exhausted() {
    let h = harness(3);
    let result = h
        .storefront
        .payment_events
        .handle(completed("evt_1", "cs_1", "pi_1"))
        .await
        .unwrap();
    let token = result.issued_token.unwrap().token.as_str().to_string();

    for _ in 0..3 {
        let download = h
            .storefront
            .request_download
            .handle(RequestDownloadCommand { token: token.clone() })
            .await
            .unwrap();
        assert!(download.is_ok());
        assert_eq!(download.file_path(), Some("guides/field-guide.pdf"));
    }

    let fourth = h
        .storefront
        .request_download
        .handle(RequestDownloadCommand { token })
        .await
        .unwrap();
    assert_eq!(fourth.reason(), Some(DenialReason::Exhausted));
}

#[tokio::test]
async fn redelivered_event_is_duplicate_without_second_token() {
    let h = harness(3);
    h.storefront
        .payment_events
        .handle(completed("evt_1", "cs_1", "pi_1"))
        .await
        .unwrap();

    let second = h
        .storefront
        .payment_events
        .handle(completed("evt_1", "cs_1", "pi_1"))
        .await
        .unwrap();

    assert_eq!(second.status, ReconciliationStatus::Duplicate);
    assert!(second.issued_token.is_none());
    assert_eq!(h.tokens.len().await, 1);
    assert_eq!(h.notifier.notices().await.len(), 1);
}

// =============================================================================
// Idempotency under distinct event ids and concurrency
// =============================================================================

#[tokio::test]
async fn second_completion_event_for_same_payment_is_absorbed() {
    let h = harness(3);
    h.storefront
        .payment_events
        .handle(completed("evt_1", "cs_1", "pi_1"))
        .await
        .unwrap();

    let repeat = h
        .storefront
        .payment_events
        .handle(completed("evt_2", "cs_1", "pi_1"))
        .await
        .unwrap();

    assert_eq!(repeat.status, ReconciliationStatus::Processed);
    assert!(repeat.issued_token.is_none());
    assert_eq!(h.tokens.len().await, 1);
}

#[tokio::test]
async fn concurrent_deliveries_of_one_event_issue_one_token() {
    let h = harness(3);
    let engine = h.storefront.payment_events.clone();

    let results = futures::future::join_all(
        (0..8).map(|_| {
            let engine = engine.clone();
            async move { engine.handle(completed("evt_1", "cs_1", "pi_1")).await }
        }),
    )
    .await;

    let processed = results
        .iter()
        .filter(|r| matches!(r, Ok(res) if res.status == ReconciliationStatus::Processed))
        .count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Ok(res) if res.status == ReconciliationStatus::Duplicate))
        .count();

    assert_eq!(processed, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(h.tokens.len().await, 1);
}

#[tokio::test]
async fn concurrent_distinct_events_for_one_session_issue_one_token() {
    let h = harness(3);
    let engine = h.storefront.payment_events.clone();

    let results = futures::future::join_all((0..8).map(|i| {
        let engine = engine.clone();
        async move {
            engine
                .handle(completed(&format!("evt_{}", i), "cs_1", "pi_1"))
                .await
        }
    }))
    .await;

    assert!(results.iter().all(|r| r.is_ok()));
    let issued = results
        .iter()
        .filter(|r| matches!(r, Ok(res) if res.issued_token.is_some()))
        .count();
    assert_eq!(issued, 1);
    assert_eq!(h.tokens.len().await, 1);
}

// =============================================================================
// Cancellation, refund, unknown events
// =============================================================================

#[tokio::test]
async fn expiry_for_unknown_session_is_recorded_only() {
    let h = harness(3);

    let result = h
        .storefront
        .payment_events
        .handle(expired("evt_1", "cs_never_seen"))
        .await
        .unwrap();

    assert_eq!(result.status, ReconciliationStatus::New);
    assert!(h.orders.is_empty().await);
    let stored = h.events.find_by_event_id(&event("evt_1")).await.unwrap().unwrap();
    assert_eq!(stored.processing, ProcessingState::Processed);
}

#[tokio::test]
async fn expiry_after_completion_is_rejected_and_order_unchanged() {
    let h = harness(3);
    h.storefront
        .payment_events
        .handle(completed("evt_1", "cs_1", "pi_1"))
        .await
        .unwrap();

    let err = h
        .storefront
        .payment_events
        .handle(expired("evt_2", "cs_1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconciliationError::InvalidTransition { .. }));
    assert!(!err.is_retryable());
    let order = h.orders.find_by_session_id(&session("cs_1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    let stored = h.events.find_by_event_id(&event("evt_2")).await.unwrap().unwrap();
    assert_eq!(stored.processing, ProcessingState::Rejected);
}

#[tokio::test]
async fn refund_marks_order_refunded_and_revokes_tokens() {
    let h = harness(3);
    let result = h
        .storefront
        .payment_events
        .handle(completed("evt_1", "cs_1", "pi_1"))
        .await
        .unwrap();
    let token = result.issued_token.unwrap().token.as_str().to_string();

    let refund = h
        .storefront
        .payment_events
        .handle(refunded("evt_2", "pi_1"))
        .await
        .unwrap();

    assert_eq!(refund.status, ReconciliationStatus::Processed);
    assert_eq!(refund.order.unwrap().status, OrderStatus::Refunded);

    let download = h
        .storefront
        .request_download
        .handle(RequestDownloadCommand { token })
        .await
        .unwrap();
    assert_eq!(download.reason(), Some(DenialReason::Revoked));
}

#[tokio::test]
async fn refund_before_completion_is_replayed_once_order_exists() {
    let h = harness(3);

    let err = h
        .storefront
        .payment_events
        .handle(refunded("evt_refund", "pi_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconciliationError::OrderNotFound(_)));
    let stored = h
        .events
        .find_by_event_id(&event("evt_refund"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.processing, ProcessingState::Failed);

    h.storefront
        .payment_events
        .handle(completed("evt_done", "cs_1", "pi_1"))
        .await
        .unwrap();
    let replay = h
        .storefront
        .replay
        .handle(ReplayUnprocessedCommand::default())
        .await
        .unwrap();

    assert_eq!(replay.processed, 1);
    let order = h.orders.find_by_session_id(&session("cs_1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);
}

#[tokio::test]
async fn unknown_event_type_is_recorded_without_ledger_change() {
    let h = harness(3);

    let result = h
        .storefront
        .payment_events
        .handle(unknown("evt_1"))
        .await
        .unwrap();

    assert_eq!(result.status, ReconciliationStatus::New);
    assert!(h.orders.is_empty().await);
    assert!(h.events.find_by_event_id(&event("evt_1")).await.unwrap().is_some());
}

#[tokio::test]
async fn malformed_payload_is_rejected_not_replayed() {
    let h = harness(3);
    let mut cmd = completed("evt_1", "cs_1", "pi_1");
    cmd.payload = b"{not json".to_vec();

    let err = h.storefront.payment_events.handle(cmd).await.unwrap_err();

    assert!(matches!(err, ReconciliationError::MalformedPayload(_)));
    let replay = h
        .storefront
        .replay
        .handle(ReplayUnprocessedCommand::default())
        .await
        .unwrap();
    assert_eq!(replay.processed + replay.failed, 0);
}
