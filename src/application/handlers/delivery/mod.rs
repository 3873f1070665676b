//! Delivery handlers.
//!
//! ## Services
//! - `TokenVault` - token issuance, atomic redemption, revocation
//!
//! ## Commands
//! - Redeeming a download token (delivery gateway)
//! - Reissuing a download link for a paid order
//! - Revoking a download link

mod reissue_token;
mod request_download;
mod revoke_token;
mod token_vault;

pub use reissue_token::{ReissueTokenCommand, ReissueTokenHandler, ReissueTokenResult};
pub use request_download::{
    AuthorizedDownload, RequestDownloadCommand, RequestDownloadHandler, RequestDownloadResult,
};
pub use revoke_token::{RevokeTokenCommand, RevokeTokenHandler, RevokeTokenResult};
pub use token_vault::{ConsumeOutcome, TokenVault};
