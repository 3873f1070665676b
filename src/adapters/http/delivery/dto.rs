//! HTTP DTOs for delivery endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::delivery::DenialReason;

/// Error envelope returned for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message. Never contains internal identifiers.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<DenialReason> for ErrorResponse {
    fn from(reason: DenialReason) -> Self {
        Self::new(reason.as_str(), reason.message())
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
