//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `WebhookEventRepository` - Payment event ledger and deduplication
//! - `OrderRepository` - Order ledger with compare-and-set transitions
//! - `DownloadTokenRepository` - Token vault with atomic redemption
//! - `ProductRepository` - Product catalog
//!
//! ## Notification Ports
//!
//! - `DeliveryNotifier` - Hands issued download links to a sender

mod delivery_notifier;
mod download_token_repository;
mod order_repository;
mod product_repository;
mod webhook_event_repository;

pub use delivery_notifier::{DeliveryNotifier, TokenIssuedNotice};
pub use download_token_repository::{ConsumeResult, DownloadTokenRepository};
pub use order_repository::OrderRepository;
pub use product_repository::ProductRepository;
pub use webhook_event_repository::{
    ProcessingState, RecordOutcome, WebhookEventRecord, WebhookEventRepository,
};
