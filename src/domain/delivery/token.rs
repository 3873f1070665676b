//! Download token entity.
//!
//! A token is a bearer capability: whoever presents the string may download
//! the order's file while the token is usable. Usability is
//! `!revoked && now < expires_at && download_count < max_downloads`.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Duration;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DownloadTokenId, OrderId, Timestamp, ValidationError};

use super::DenialReason;

/// Bytes of OS entropy per token (256 bits).
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Upper bound on `max_downloads` for a single token.
pub const MAX_DOWNLOADS_CEILING: u32 = 100;

/// Default number of downloads per token.
pub const DEFAULT_MAX_DOWNLOADS: u32 = 3;

/// The opaque, unguessable string handed to the buyer.
///
/// `Debug` is redacted so the value never reaches logs by accident.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenValue(String);

impl TokenValue {
    /// Generates a fresh value from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps a value presented by a client.
    ///
    /// Returns `None` for strings that could never have been issued, so
    /// obvious garbage is refused without a storage round-trip.
    pub fn parse(presented: &str) -> Option<Self> {
        let well_formed = !presented.is_empty()
            && presented.len() <= 128
            && presented
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        well_formed.then(|| Self(presented.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenValue(**redacted**)")
    }
}

/// How a token came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Issued when the order first completed. At most one per order.
    Initial,
    /// Issued later on request, e.g. after the initial token expired.
    Reissue,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Initial => "initial",
            TokenKind::Reissue => "reissue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(TokenKind::Initial),
            "reissue" => Some(TokenKind::Reissue),
            _ => None,
        }
    }
}

/// Issuance parameters for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub ttl: Duration,
    pub max_downloads: u32,
}

impl TokenPolicy {
    pub fn new(ttl: Duration, max_downloads: u32) -> Result<Self, ValidationError> {
        if ttl <= Duration::zero() {
            return Err(ValidationError::invalid_format("ttl", "must be positive"));
        }
        if max_downloads == 0 || max_downloads > MAX_DOWNLOADS_CEILING {
            return Err(ValidationError::out_of_range(
                "max_downloads",
                1,
                i64::from(MAX_DOWNLOADS_CEILING),
                i64::from(max_downloads),
            ));
        }
        Ok(Self { ttl, max_downloads })
    }
}

/// A capability to download the file of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadToken {
    pub id: DownloadTokenId,
    pub token: TokenValue,
    pub order_id: OrderId,
    pub kind: TokenKind,
    pub expires_at: Timestamp,
    pub max_downloads: u32,
    pub download_count: u32,
    pub revoked: bool,
    pub created_at: Timestamp,
}

impl DownloadToken {
    /// Issues a fresh, unused token bound to `order_id`.
    pub fn issue(order_id: OrderId, kind: TokenKind, policy: TokenPolicy, now: Timestamp) -> Self {
        Self {
            id: DownloadTokenId::new(),
            token: TokenValue::generate(),
            order_id,
            kind,
            expires_at: now.plus(policy.ttl),
            max_downloads: policy.max_downloads,
            download_count: 0,
            revoked: false,
            created_at: now,
        }
    }

    /// Checks usability at `now`.
    ///
    /// Revocation takes precedence over expiry, and expiry over exhaustion.
    pub fn check_usable(&self, now: Timestamp) -> Result<(), DenialReason> {
        if self.revoked {
            return Err(DenialReason::Revoked);
        }
        if !now.is_before(&self.expires_at) {
            return Err(DenialReason::Expired);
        }
        if self.download_count >= self.max_downloads {
            return Err(DenialReason::Exhausted);
        }
        Ok(())
    }

    /// Checks usability and records one download.
    pub fn consume(&mut self, now: Timestamp) -> Result<(), DenialReason> {
        self.check_usable(now)?;
        self.download_count += 1;
        Ok(())
    }

    pub fn remaining_downloads(&self) -> u32 {
        self.max_downloads.saturating_sub(self.download_count)
    }
}
