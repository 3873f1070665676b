//! Payment event handlers.
//!
//! ## Commands
//! - Reconciling a verified processor event against the order ledger
//! - Replaying stored events whose processing did not finish

mod handle_payment_event;
mod replay_unprocessed;

pub use handle_payment_event::{
    HandlePaymentEventCommand, HandlePaymentEventHandler, ReconciliationResult,
    ReconciliationStatus,
};
pub use replay_unprocessed::{
    ReplayUnprocessedCommand, ReplayUnprocessedHandler, ReplayUnprocessedResult,
};
