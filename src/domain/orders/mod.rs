//! Order ledger domain.
//!
//! - `aggregate` - Order entity
//! - `status` - OrderStatus transition table
//! - `errors` - OrderError

mod aggregate;
mod errors;
mod status;

pub use aggregate::Order;
pub use errors::OrderError;
pub use status::{OrderStatus, OrderTransition};
