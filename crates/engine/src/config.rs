//! Orchestrator configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment overrides. The file lives at `NFTDONATE_CONFIG_PATH` when that
//! is set, otherwise at `<config dir>/nftdonate/config.json`. A missing file is
//! not an error; an unreadable or malformed one is.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use dirs_next::config_dir;
use nftdonate_util::expand_tilde;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ConfigError;

pub const CONFIG_PATH_ENV: &str = "NFTDONATE_CONFIG_PATH";
pub const APP_ADDRESS_ENV: &str = "IEXEC_APP_ADDRESS";
pub const NETWORK_ENV: &str = "IEXEC_NETWORK";
pub const GATEWAY_URL_ENV: &str = "MARKETPLACE_GATEWAY_URL";
pub const WORKERPOOL_ENV: &str = "IEXEC_WORKERPOOL";

pub const DEFAULT_WORKERPOOL: &str = "prod-v8-bellecour.main.pools.iexec.eth";
pub const DEFAULT_GATEWAY_URL: &str = "https://api.market.v8-bellecour.iex.ec";
pub const DEFAULT_STORAGE_PROVIDER: &str = "ipfs";
pub const DEFAULT_STORAGE_PROXY: &str = "https://result-proxy.iex.ec";

/// Chain the marketplace contracts live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Bellecour,
    Sepolia,
}

impl Network {
    pub fn chain_id(self) -> u64 {
        match self {
            Self::Bellecour => 134,
            Self::Sepolia => 11_155_111,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            134 => Some(Self::Bellecour),
            11_155_111 => Some(Self::Sepolia),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bellecour => "bellecour",
            Self::Sepolia => "sepolia",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = String;

    /// Accepts a network name or its chain id.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Ok(chain_id) = value.parse::<u64>() {
            return Self::from_chain_id(chain_id).ok_or_else(|| format!("unsupported chain id {chain_id}"));
        }
        match value.to_ascii_lowercase().as_str() {
            "bellecour" => Ok(Self::Bellecour),
            "sepolia" => Ok(Self::Sepolia),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

/// Where the worker's result document is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStorage {
    pub provider: String,
    pub proxy: String,
}

impl Default for ResultStorage {
    fn default() -> Self {
        Self {
            provider: DEFAULT_STORAGE_PROVIDER.to_string(),
            proxy: DEFAULT_STORAGE_PROXY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Registered worker application. Checked at submission time.
    pub app_address: Option<String>,
    pub network: Network,
    pub workerpool: String,
    pub gateway_url: String,
    pub result_storage: ResultStorage,
    pub poll_interval_secs: u64,
    pub deadline_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_address: None,
            network: Network::default(),
            workerpool: DEFAULT_WORKERPOOL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            result_storage: ResultStorage::default(),
            poll_interval_secs: 10,
            deadline_secs: 300,
        }
    }
}

impl EngineConfig {
    /// Resolve the configuration from the default path and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            debug!(path = %path.display(), "no config file; using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject timing values that would make polling spin or never start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("poll_interval_secs", self.poll_interval_secs), ("deadline_secs", self.deadline_secs)] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Overlay the `IEXEC_*` and gateway variables on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(app) = env_value(APP_ADDRESS_ENV) {
            self.app_address = Some(app);
        }
        if let Some(network) = env_value(NETWORK_ENV) {
            self.network = network.parse().map_err(|_| ConfigError::InvalidValue {
                name: NETWORK_ENV,
                value: network,
            })?;
        }
        if let Some(url) = env_value(GATEWAY_URL_ENV) {
            self.gateway_url = url;
        }
        if let Some(pool) = env_value(WORKERPOOL_ENV) {
            self.workerpool = pool;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// Returns the path of the configuration file, honoring `NFTDONATE_CONFIG_PATH`.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = env_value(CONFIG_PATH_ENV) {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nftdonate")
        .join("config.json")
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
