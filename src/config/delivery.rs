//! Delivery configuration
//!
//! Token issuance policy and the replay window for unfinished events.

use serde::Deserialize;

use crate::domain::delivery::{TokenPolicy, DEFAULT_MAX_DOWNLOADS, MAX_DOWNLOADS_CEILING};

use super::error::ValidationError;

/// Longest token lifetime accepted from configuration (one year).
const MAX_TOKEN_TTL_HOURS: u32 = 24 * 365;

/// Delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Lifetime of an issued token in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,

    /// Downloads allowed per token
    #[serde(default = "default_max_downloads")]
    pub max_downloads: u32,

    /// Age after which a pending event counts as abandoned and is replayed
    #[serde(default = "default_replay_grace_secs")]
    pub replay_grace_secs: u64,

    /// Interval of the background replay sweep in seconds; 0 disables it
    #[serde(default = "default_replay_interval_secs")]
    pub replay_interval_secs: u64,
}

impl DeliveryConfig {
    /// Issuance policy for new tokens.
    pub fn token_policy(&self) -> Result<TokenPolicy, ValidationError> {
        self.validate()?;
        TokenPolicy::new(
            chrono::Duration::hours(i64::from(self.token_ttl_hours)),
            self.max_downloads,
        )
        .map_err(|_| ValidationError::InvalidMaxDownloads {
            max: MAX_DOWNLOADS_CEILING,
        })
    }

    /// Replay grace period as a chrono Duration.
    pub fn replay_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.replay_grace_secs).unwrap_or(i64::MAX / 1_000))
    }

    /// Background replay interval, if enabled.
    pub fn replay_interval(&self) -> Option<std::time::Duration> {
        (self.replay_interval_secs > 0)
            .then(|| std::time::Duration::from_secs(self.replay_interval_secs))
    }

    /// Validate delivery configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.token_ttl_hours == 0 || self.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ValidationError::InvalidTokenTtl {
                max: MAX_TOKEN_TTL_HOURS,
            });
        }
        if self.max_downloads == 0 || self.max_downloads > MAX_DOWNLOADS_CEILING {
            return Err(ValidationError::InvalidMaxDownloads {
                max: MAX_DOWNLOADS_CEILING,
            });
        }
        if self.replay_grace_secs == 0 || self.replay_grace_secs > 86_400 {
            return Err(ValidationError::InvalidReplayGrace);
        }
        Ok(())
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: default_token_ttl_hours(),
            max_downloads: default_max_downloads(),
            replay_grace_secs: default_replay_grace_secs(),
            replay_interval_secs: default_replay_interval_secs(),
        }
    }
}

fn default_token_ttl_hours() -> u32 {
    72
}

fn default_max_downloads() -> u32 {
    DEFAULT_MAX_DOWNLOADS
}

fn default_replay_grace_secs() -> u64 {
    300
}

fn default_replay_interval_secs() -> u64 {
    60
}
