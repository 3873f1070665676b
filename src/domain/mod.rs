//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `orders` - Order aggregate and its status lifecycle
//! - `catalog` - Sellable digital products
//! - `delivery` - Download tokens and denial reasons
//! - `payments` - Processor events and the ledger actions they imply

pub mod catalog;
pub mod delivery;
pub mod foundation;
pub mod orders;
pub mod payments;
