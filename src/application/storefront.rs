//! Storefront - wires every handler from one set of ports.
//!
//! The binary builds it over PostgreSQL adapters; tests build it over the
//! in-memory adapters. Handlers share the same `TokenVault` and ledger, so
//! there is exactly one issuance policy per process.

use std::sync::Arc;

use chrono::Duration;

use crate::domain::delivery::TokenPolicy;
use crate::ports::{
    DeliveryNotifier, DownloadTokenRepository, OrderRepository, ProductRepository,
    WebhookEventRepository,
};

use super::handlers::{
    HandlePaymentEventHandler, OrderLedger, ReissueTokenHandler, ReplayUnprocessedHandler,
    RequestDownloadHandler, RevokeTokenHandler, TokenVault,
};

/// Storage and notification collaborators.
#[derive(Clone)]
pub struct StorefrontPorts {
    pub orders: Arc<dyn OrderRepository>,
    pub tokens: Arc<dyn DownloadTokenRepository>,
    pub events: Arc<dyn WebhookEventRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub notifier: Arc<dyn DeliveryNotifier>,
}

/// Handler set for one process.
#[derive(Clone)]
pub struct Storefront {
    pub payment_events: Arc<HandlePaymentEventHandler>,
    pub replay: Arc<ReplayUnprocessedHandler>,
    pub request_download: Arc<RequestDownloadHandler>,
    pub reissue_token: Arc<ReissueTokenHandler>,
    pub revoke_token: Arc<RevokeTokenHandler>,
    pub vault: TokenVault,
    pub ledger: OrderLedger,
}

impl Storefront {
    pub fn new(ports: StorefrontPorts, policy: TokenPolicy, replay_grace: Duration) -> Self {
        let ledger = OrderLedger::new(ports.orders.clone());
        let vault = TokenVault::new(ports.tokens.clone(), ports.orders.clone(), policy);

        let payment_events = Arc::new(HandlePaymentEventHandler::new(
            ports.events.clone(),
            ledger.clone(),
            vault.clone(),
            ports.notifier.clone(),
            replay_grace,
        ));
        let replay = Arc::new(ReplayUnprocessedHandler::new(
            ports.events.clone(),
            payment_events.clone(),
            replay_grace,
        ));
        let request_download = Arc::new(RequestDownloadHandler::new(
            vault.clone(),
            ports.products.clone(),
        ));
        let reissue_token = Arc::new(ReissueTokenHandler::new(
            ports.orders.clone(),
            vault.clone(),
            ports.notifier.clone(),
        ));
        let revoke_token = Arc::new(RevokeTokenHandler::new(vault.clone()));

        Self {
            payment_events,
            replay,
            request_download,
            reissue_token,
            revoke_token,
            vault,
            ledger,
        }
    }
}
