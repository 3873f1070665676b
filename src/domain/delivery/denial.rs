//! Reasons a download token cannot be redeemed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a presented token was refused.
///
/// These are user-facing and carry no internal identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No token with this value exists.
    NotFound,
    /// The token's lifetime has ended.
    Expired,
    /// The token was revoked.
    Revoked,
    /// Every allowed download has been used.
    Exhausted,
}

impl DenialReason {
    /// Stable machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NotFound => "not_found",
            DenialReason::Expired => "expired",
            DenialReason::Revoked => "revoked",
            DenialReason::Exhausted => "exhausted",
        }
    }

    /// Message suitable for showing to the buyer.
    pub fn message(&self) -> &'static str {
        match self {
            DenialReason::NotFound => "This download link is not valid",
            DenialReason::Expired => "This download link has expired",
            DenialReason::Revoked => "This download link has been revoked",
            DenialReason::Exhausted => "This download link has reached its download limit",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
