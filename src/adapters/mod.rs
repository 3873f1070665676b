//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-memory repositories for tests and local runs
//! - `postgres` - PostgreSQL repositories
//! - `notifications` - Delivery notifiers
//! - `http` - Axum delivery endpoint

pub mod http;
pub mod memory;
pub mod notifications;
pub mod postgres;

pub use memory::{
    InMemoryDownloadTokenRepository, InMemoryOrderRepository, InMemoryProductRepository,
    InMemoryWebhookEventRepository,
};
pub use notifications::{RecordingNotifier, TracingNotifier};
