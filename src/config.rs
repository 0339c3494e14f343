use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::common::error::{PmsError, Result};
use crate::vendor::RetryPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Application configuration. Every section is optional in the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub vendor: VendorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// `host:port` for the Prometheus exporter; metrics are off when unset
    pub metrics_addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            metrics_addr: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. The in-memory store is used when unset.
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Probability that a simulated vendor call fails transiently
    pub failure_rate: f64,
    pub retry: RetryPolicy,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            failure_rate: 1.0 / 11.0,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_name: String,
    /// Used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_name: "pms_bridge.log".to_string(),
            default_filter: "pms_bridge=info".to_string(),
        }
    }
}

impl Config {
    /// Load a TOML file (defaults if absent), then env overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                PmsError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml_str(&content)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `PMS_BRIDGE_PORT`, `PMS_BRIDGE_DATABASE`, `PMS_BRIDGE_VENDOR_FAILURE_RATE`,
    /// `PMS_BRIDGE_METRICS_ADDR`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PMS_BRIDGE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| PmsError::Config(format!("PMS_BRIDGE_PORT is not a port: {port}")))?;
        }
        if let Some(path) = lookup("PMS_BRIDGE_DATABASE") {
            self.storage.sqlite_path = Some(path).filter(|p| !p.is_empty());
        }
        if let Some(rate) = lookup("PMS_BRIDGE_VENDOR_FAILURE_RATE") {
            self.vendor.failure_rate = rate.parse().map_err(|_| {
                PmsError::Config(format!("PMS_BRIDGE_VENDOR_FAILURE_RATE is not a number: {rate}"))
            })?;
        }
        if let Some(addr) = lookup("PMS_BRIDGE_METRICS_ADDR") {
            self.server.metrics_addr = Some(addr).filter(|a| !a.is_empty());
        }
        Ok(())
    }
}
