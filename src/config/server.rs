//! Listener settings for the download endpoint.

use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use super::error::ValidationError;

/// Longest a single download request may take before it is cut off.
const MAX_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// `host:port` the download endpoint binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub environment: Environment,

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-request bound on `GET /downloads/:token`, in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

/// Deployment environment. Production switches logs to JSON.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        self.listen_addr
            .parse()
            .map_err(|_| ValidationError::InvalidListenAddr(self.listen_addr.clone()))
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        // Port 0 would bind an ephemeral port the proxy cannot know.
        if self.socket_addr()?.port() == 0 {
            return Err(ValidationError::InvalidListenAddr(self.listen_addr.clone()));
        }
        if !(1..=MAX_DOWNLOAD_TIMEOUT_SECS).contains(&self.download_timeout_secs) {
            return Err(ValidationError::InvalidDownloadTimeout {
                max: MAX_DOWNLOAD_TIMEOUT_SECS,
            });
        }
        if self.log_level.trim().is_empty() {
            return Err(ValidationError::MissingRequired("server.log_level"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            environment: Environment::default(),
            log_level: default_log_level(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info,digital_storefront=debug,sqlx=warn".to_string()
}

fn default_download_timeout_secs() -> u64 {
    10
}
