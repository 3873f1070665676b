//! In-memory adapters for every storage port.
//!
//! Same compare-and-set semantics as the PostgreSQL adapters, with a single
//! async lock per store standing in for row-level atomicity. Used by tests
//! and local runs without a database. Nothing persists across restarts.

mod events;
mod orders;
mod products;
mod tokens;

pub use events::InMemoryWebhookEventRepository;
pub use orders::InMemoryOrderRepository;
pub use products::InMemoryProductRepository;
pub use tokens::InMemoryDownloadTokenRepository;
