//! HTTP adapters - REST API implementations.
//!
//! Only download delivery is exposed. The webhook receiver lives outside
//! this crate and calls the reconciliation engine directly.

pub mod delivery;

pub use delivery::{delivery_router, DeliveryAppState};
