//! Application handlers.
//!
//! Command handlers and services that orchestrate domain operations.

pub mod delivery;
pub mod orders;
pub mod payments;

pub use delivery::{
    AuthorizedDownload, ConsumeOutcome, ReissueTokenCommand, ReissueTokenHandler,
    ReissueTokenResult, RequestDownloadCommand, RequestDownloadHandler, RequestDownloadResult,
    RevokeTokenCommand, RevokeTokenHandler, RevokeTokenResult, TokenVault,
};
pub use orders::{CompletionOutcome, OrderLedger};
pub use payments::{
    HandlePaymentEventCommand, HandlePaymentEventHandler, ReconciliationResult,
    ReconciliationStatus, ReplayUnprocessedCommand, ReplayUnprocessedHandler,
    ReplayUnprocessedResult,
};
