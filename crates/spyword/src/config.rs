//! Server configuration: an optional TOML file, then environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use spyword_room::{DEFAULT_MAX_NAME_LEN, StoreConfig};

use crate::dispatcher::DispatchConfig;

/// Port the server listens on unless the config file or environment names one.
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Everything the server binary can be told.
///
/// ```toml
/// bind = "0.0.0.0:3000"
/// idle_timeout_secs = 600
/// max_name_len = 12
/// enforce_host = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,

    /// Drop a connection after this many seconds without an inbound
    /// frame. Absent means connections may idle forever.
    pub idle_timeout_secs: Option<u64>,

    /// Display names are truncated to this many characters.
    pub max_name_len: usize,

    /// Drop host-only intents sent by anyone but the room's host.
    pub enforce_host: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            idle_timeout_secs: None,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            enforce_host: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file. Missing keys keep defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Applies `SPYWORD_BIND` and `PORT` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    ///
    /// `SPYWORD_BIND` wins over `PORT`; `PORT` binds every interface on
    /// that port. A `PORT` that is not a number is ignored.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        if let Some(bind) = lookup("SPYWORD_BIND") {
            self.bind = bind;
        } else if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.bind = format!("0.0.0.0:{port}"),
                Err(_) => tracing::warn!(%port, "ignoring non-numeric PORT"),
            }
        }
        self
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_name_len: self.max_name_len,
            ..StoreConfig::default()
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            enforce_host: self.enforce_host,
        }
    }
}
