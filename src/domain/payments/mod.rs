//! Payment processor events and the ledger actions they imply.

mod errors;
mod event;

pub use errors::ReconciliationError;
pub use event::{
    CheckoutCompletion, PaymentAction, PaymentEvent, PaymentEventType, RefundReference,
};
