//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers are the only place that logs; storage adapters stay silent.

pub mod handlers;
mod storefront;

pub use handlers::{
    // Reconciliation
    HandlePaymentEventCommand, HandlePaymentEventHandler, ReconciliationResult,
    ReconciliationStatus, ReplayUnprocessedCommand, ReplayUnprocessedHandler,
    ReplayUnprocessedResult,
    // Delivery
    ReissueTokenCommand, ReissueTokenHandler, RequestDownloadCommand, RequestDownloadHandler,
    RequestDownloadResult, RevokeTokenCommand, RevokeTokenHandler, TokenVault,
    // Orders
    OrderLedger,
};
pub use storefront::{Storefront, StorefrontPorts};
