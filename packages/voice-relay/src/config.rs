//! TOML configuration with defaults for every field.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use voice_relay_vad::{DetectorBackend, SegmenterConfig};

use crate::retry::{ExponentialBackoff, FixedDelay, RetryPolicy};

pub const DEFAULT_SERVER_URL: &str = "wss://localhost:8443";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub segmenter: SegmenterConfig,
    pub detector: DetectorBackend,
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    /// Trust self-signed certificates.
    pub accept_invalid_certs: bool,
    pub reconnect: ReconnectConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            accept_invalid_certs: false,
            reconnect: ReconnectConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReconnectConfig {
    Fixed {
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
        #[serde(default)]
        max_attempts: Option<u32>,
    },
    Exponential {
        #[serde(default = "default_initial_ms")]
        initial_ms: u64,
        #[serde(default = "default_max_ms")]
        max_ms: u64,
        #[serde(default)]
        max_attempts: Option<u32>,
    },
}

const fn default_delay_ms() -> u64 {
    5000
}

const fn default_initial_ms() -> u64 {
    500
}

const fn default_max_ms() -> u64 {
    30_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig::Fixed {
            delay_ms: default_delay_ms(),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> Arc<dyn RetryPolicy> {
        match *self {
            ReconnectConfig::Fixed {
                delay_ms,
                max_attempts,
            } => Arc::new(FixedDelay {
                delay: Duration::from_millis(delay_ms),
                max_attempts,
            }),
            ReconnectConfig::Exponential {
                initial_ms,
                max_ms,
                max_attempts,
            } => Arc::new(ExponentialBackoff {
                initial: Duration::from_millis(initial_ms),
                max: Duration::from_millis(max_ms),
                max_attempts,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; the system default when unset.
    pub device: Option<String>,
    /// Replay this file instead of capturing.
    pub wav: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Also send every broadcast as a JSON datagram to this address.
    pub udp_target: Option<SocketAddr>,
}

impl RelayConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server.url.as_str();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "server url must use ws:// or wss://, got {url}"
            )));
        }
        self.segmenter
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
