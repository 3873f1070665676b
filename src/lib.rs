//! Digital Storefront - order reconciliation and secure download delivery
//!
//! Turns at-least-once payment processor notifications into an exactly-once
//! order ledger, and grants buyers time-boxed, count-limited, revocable
//! download links for what they bought.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
