//! Download delivery domain.
//!
//! - `token` - DownloadToken capability and its usability rule
//! - `denial` - DenialReason surfaced to buyers
//! - `errors` - DeliveryError for non-denial failures

mod denial;
mod errors;
mod token;

pub use denial::DenialReason;
pub use errors::DeliveryError;
pub use token::{
    DownloadToken, TokenKind, TokenPolicy, TokenValue, DEFAULT_MAX_DOWNLOADS,
    MAX_DOWNLOADS_CEILING,
};
