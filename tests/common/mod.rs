//! Shared fixtures for integration tests: a storefront over in-memory
//! adapters, a token store with injectable failures, and processor-shaped
//! event payloads.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;

use digital_storefront::adapters::memory::{
    InMemoryDownloadTokenRepository, InMemoryOrderRepository, InMemoryProductRepository,
    InMemoryWebhookEventRepository,
};
use digital_storefront::adapters::notifications::RecordingNotifier;
use digital_storefront::application::{HandlePaymentEventCommand, Storefront, StorefrontPorts};
use digital_storefront::domain::catalog::{NewProduct, Product};
use digital_storefront::domain::delivery::{DownloadToken, TokenPolicy, TokenValue};
use digital_storefront::domain::foundation::{DomainError, OrderId, ProductId, Timestamp};
use digital_storefront::ports::{ConsumeResult, DownloadTokenRepository};

pub struct Harness {
    pub storefront: Storefront,
    pub orders: Arc<InMemoryOrderRepository>,
    pub tokens: Arc<InMemoryDownloadTokenRepository>,
    pub events: Arc<InMemoryWebhookEventRepository>,
    pub products: Arc<InMemoryProductRepository>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(max_downloads: u32) -> Harness {
    let tokens = Arc::new(InMemoryDownloadTokenRepository::new());
    harness_over(max_downloads, tokens.clone(), tokens)
}

/// Harness whose storefront reaches `tokens` through `port`.
pub fn harness_over(
    max_downloads: u32,
    tokens: Arc<InMemoryDownloadTokenRepository>,
    port: Arc<dyn DownloadTokenRepository>,
) -> Harness {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let events = Arc::new(InMemoryWebhookEventRepository::new());
    let products = Arc::new(InMemoryProductRepository::with_products(vec![product("p1")]));
    let notifier = Arc::new(RecordingNotifier::new());

    let storefront = Storefront::new(
        StorefrontPorts {
            orders: orders.clone(),
            tokens: port,
            events: events.clone(),
            products: products.clone(),
            notifier: notifier.clone(),
        },
        TokenPolicy::new(Duration::hours(72), max_downloads).unwrap(),
        Duration::seconds(300),
    );

    Harness {
        storefront,
        orders,
        tokens,
        events,
        products,
        notifier,
    }
}

/// Token store that fails a configured number of initial inserts or
/// revocations with a storage error before delegating.
pub struct FlakyTokens {
    inner: Arc<InMemoryDownloadTokenRepository>,
    initial_insert_failures: AtomicU32,
    revoke_failures: AtomicU32,
}

impl FlakyTokens {
    pub fn new(inner: Arc<InMemoryDownloadTokenRepository>) -> Self {
        Self {
            inner,
            initial_insert_failures: AtomicU32::new(0),
            revoke_failures: AtomicU32::new(0),
        }
    }

    pub fn fail_initial_inserts(&self, times: u32) {
        self.initial_insert_failures.store(times, Ordering::SeqCst);
    }

    pub fn fail_revokes(&self, times: u32) {
        self.revoke_failures.store(times, Ordering::SeqCst);
    }
}

fn take_failure(remaining: &AtomicU32) -> Result<(), DomainError> {
    match remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)) {
        Ok(_) => Err(DomainError::database("connection reset by peer")),
        Err(_) => Ok(()),
    }
}

#[async_trait]
impl DownloadTokenRepository for FlakyTokens {
    async fn insert(&self, token: &DownloadToken) -> Result<(), DomainError> {
        self.inner.insert(token).await
    }

    async fn insert_initial_if_absent(
        &self,
        token: &DownloadToken,
    ) -> Result<(DownloadToken, bool), DomainError> {
        take_failure(&self.initial_insert_failures)?;
        self.inner.insert_initial_if_absent(token).await
    }

    async fn consume(
        &self,
        token: &TokenValue,
        now: Timestamp,
    ) -> Result<ConsumeResult, DomainError> {
        self.inner.consume(token, now).await
    }

    async fn revoke(&self, token: &TokenValue) -> Result<bool, DomainError> {
        take_failure(&self.revoke_failures)?;
        self.inner.revoke(token).await
    }

    async fn find_by_token(
        &self,
        token: &TokenValue,
    ) -> Result<Option<DownloadToken>, DomainError> {
        self.inner.find_by_token(token).await
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<DownloadToken>, DomainError> {
        self.inner.list_for_order(order_id).await
    }
}

/// Harness over a `FlakyTokens` store; `Harness::tokens` is the backing store.
pub fn flaky_harness(max_downloads: u32) -> (Harness, Arc<FlakyTokens>) {
    let tokens = Arc::new(InMemoryDownloadTokenRepository::new());
    let flaky = Arc::new(FlakyTokens::new(tokens.clone()));
    (harness_over(max_downloads, tokens, flaky.clone()), flaky)
}

pub fn product(id: &str) -> Product {
    Product::create(NewProduct {
        id: ProductId::new(id).unwrap(),
        processor_product_id: format!("prod_{}", id),
        processor_price_id: format!("price_{}", id),
        title: "Field Guide".to_string(),
        description: "A PDF field guide".to_string(),
        file_path: "guides/field-guide.pdf".to_string(),
        file_name: "field-guide.pdf".to_string(),
        buy_url: Some("https://example.com/buy/p1".to_string()),
    })
    .unwrap()
}

fn envelope(event_id: &str, event_type: &str, object: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": event_id,
        "type": event_type,
        "data": { "object": object }
    }))
    .unwrap()
}

pub fn completed(event_id: &str, session: &str, intent: &str) -> HandlePaymentEventCommand {
    HandlePaymentEventCommand {
        event_id: event_id.to_string(),
        event_type: "checkout.session.completed".to_string(),
        payload: envelope(
            event_id,
            "checkout.session.completed",
            json!({
                "id": session,
                "payment_intent": intent,
                "customer_details": { "email": "buyer@example.com" },
                "metadata": { "product_id": "p1" }
            }),
        ),
    }
}

pub fn expired(event_id: &str, session: &str) -> HandlePaymentEventCommand {
    HandlePaymentEventCommand {
        event_id: event_id.to_string(),
        event_type: "checkout.session.expired".to_string(),
        payload: envelope(event_id, "checkout.session.expired", json!({ "id": session })),
    }
}

pub fn refunded(event_id: &str, intent: &str) -> HandlePaymentEventCommand {
    HandlePaymentEventCommand {
        event_id: event_id.to_string(),
        event_type: "charge.refunded".to_string(),
        payload: envelope(
            event_id,
            "charge.refunded",
            json!({ "id": "ch_1", "payment_intent": intent }),
        ),
    }
}

pub fn unknown(event_id: &str) -> HandlePaymentEventCommand {
    HandlePaymentEventCommand {
        event_id: event_id.to_string(),
        event_type: "customer.created".to_string(),
        payload: envelope(event_id, "customer.created", json!({ "id": "cus_1" })),
    }
}
