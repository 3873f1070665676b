//! Order ledger handlers.
//!
//! - `OrderLedger` - lifecycle transitions keyed by checkout session

mod order_ledger;

pub use order_ledger::{CompletionOutcome, OrderLedger};
