//! RequestDownloadHandler - the delivery gateway.
//!
//! Authorizes exactly one file transfer per successful consume. The file
//! location is resolved only after the consume has committed.

use std::sync::Arc;

use crate::domain::delivery::{DenialReason, DeliveryError};
use crate::domain::foundation::OrderId;
use crate::ports::ProductRepository;

use super::{ConsumeOutcome, TokenVault};

/// Command to redeem a download token.
#[derive(Debug, Clone)]
pub struct RequestDownloadCommand {
    /// Token string exactly as presented by the client.
    pub token: String,
}

/// A transfer the caller may now perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedDownload {
    pub order_id: OrderId,
    /// Storage-relative path of the file.
    pub file_path: String,
    /// File name to present to the buyer.
    pub file_name: String,
    pub remaining_downloads: u32,
}

/// Result of a download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDownloadResult {
    Authorized(AuthorizedDownload),
    Denied(DenialReason),
}

impl RequestDownloadResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, RequestDownloadResult::Authorized(_))
    }

    pub fn file_path(&self) -> Option<&str> {
        match self {
            RequestDownloadResult::Authorized(download) => Some(&download.file_path),
            RequestDownloadResult::Denied(_) => None,
        }
    }

    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            RequestDownloadResult::Authorized(_) => None,
            RequestDownloadResult::Denied(reason) => Some(*reason),
        }
    }
}

/// Handler for download requests.
pub struct RequestDownloadHandler {
    vault: TokenVault,
    products: Arc<dyn ProductRepository>,
}

impl RequestDownloadHandler {
    pub fn new(vault: TokenVault, products: Arc<dyn ProductRepository>) -> Self {
        Self { vault, products }
    }

    pub async fn handle(
        &self,
        cmd: RequestDownloadCommand,
    ) -> Result<RequestDownloadResult, DeliveryError> {
        let (token, order) = match self.vault.validate_and_consume(&cmd.token).await? {
            ConsumeOutcome::Granted { token, order } => (token, order),
            ConsumeOutcome::Denied(reason) => {
                tracing::info!(reason = %reason, "Download denied");
                return Ok(RequestDownloadResult::Denied(reason));
            }
        };

        let product = match self.products.find_by_id(&order.product_id).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                tracing::error!(
                    order_id = %order.id,
                    product_id = %order.product_id,
                    "Download consumed but product is missing"
                );
                return Err(DeliveryError::ProductUnavailable {
                    order_id: order.id,
                    product_id: order.product_id,
                });
            }
            Err(err) => {
                tracing::error!(
                    order_id = %order.id,
                    error = %err,
                    "Download consumed but product lookup failed"
                );
                return Err(err.into());
            }
        };

        tracing::info!(
            order_id = %order.id,
            download_count = token.download_count,
            max_downloads = token.max_downloads,
            "Download authorized"
        );

        Ok(RequestDownloadResult::Authorized(AuthorizedDownload {
            order_id: order.id,
            file_path: product.file_path,
            file_name: product.file_name,
            remaining_downloads: token.remaining_downloads(),
        }))
    }
}
