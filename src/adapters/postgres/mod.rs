//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `pool` - Connection pool and migrations
//! - `PostgresOrderRepository` - Order ledger with conditional status updates
//! - `PostgresDownloadTokenRepository` - Token vault with atomic redemption
//! - `PostgresWebhookEventRepository` - Payment event dedup ledger
//! - `PostgresProductRepository` - Product catalog

mod download_token_repository;
mod order_repository;
pub mod pool;
mod product_repository;
mod webhook_event_repository;

pub use download_token_repository::PostgresDownloadTokenRepository;
pub use order_repository::PostgresOrderRepository;
pub use pool::{connect, run_migrations};
pub use product_repository::PostgresProductRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
