//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid listen address: {0}")]
    InvalidListenAddr(String),

    #[error("Download timeout must be between 1 and {max} seconds")]
    InvalidDownloadTimeout { max: u64 },

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("max_connections must be between 1 and {max}")]
    InvalidPoolSize { max: u32 },

    #[error("Pool acquire timeout must be positive")]
    InvalidAcquireTimeout,

    #[error("Token TTL must be between 1 and {max} hours")]
    InvalidTokenTtl { max: u32 },

    #[error("max_downloads must be between 1 and {max}")]
    InvalidMaxDownloads { max: u32 },

    #[error("Replay grace period must be positive")]
    InvalidReplayGrace,
}
