//! Configuration management for GridLink
//!
//! Supports loading from TOML files and environment variables.
//!
//! ```toml
//! [discovery]
//! enabled = true
//! infosys = "bdii.example.org:2170"
//! timeout_secs = 60
//! max_endpoints = 100
//!
//! [[discovery.static_endpoints]]
//! host = "se.example.org"
//! url = "httpg://se.example.org:8446/srm/managerv2"
//! endpoint_type = "srm_v2"
//!
//! [cache]
//! ttl_secs = 600
//!
//! [catalog]
//! schemes = ["catalog", "lfc"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment key naming the discovery service base address
pub const INFOSYS_ENV: &str = "LCG_GFAL_INFOSYS";

/// Upper bound on endpoints returned for one host
pub const MAX_ENDPOINTS: usize = 100;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Source of environment-style settings.
///
/// Lets the endpoint resolver read legacy keys without touching the real
/// process environment in tests.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Complete GridLink configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridConfig {
    /// Endpoint discovery
    #[serde(default)]
    pub discovery: DiscoverySettings,

    /// Endpoint cache
    #[serde(default)]
    pub cache: CacheSettings,

    /// Replica catalog
    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl GridConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: GridConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.max_endpoints == 0 {
            return Err(ConfigError::ValidationError(
                "discovery.max_endpoints cannot be 0".to_string(),
            ));
        }

        if self.catalog.schemes.is_empty() {
            return Err(ConfigError::ValidationError(
                "catalog.schemes cannot be empty".to_string(),
            ));
        }

        for endpoint in &self.discovery.static_endpoints {
            if endpoint.host.is_empty() || endpoint.url.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "static endpoint needs both host and url: {:?}",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_env_overrides_from(&ProcessEnv)
    }

    /// Apply overrides from the given environment source
    pub fn with_env_overrides_from(mut self, env: &dyn EnvSource) -> Self {
        if let Some(enabled) = env.var("GRIDLINK_DISCOVERY_ENABLED") {
            self.discovery.enabled = enabled == "true" || enabled == "1";
        }

        if let Some(timeout) = env.var("GRIDLINK_DISCOVERY_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.discovery.timeout_secs = secs;
            }
        }

        self
    }
}

/// Discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Enable endpoint discovery at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Discovery service base address, used when the environment
    /// does not provide one
    #[serde(default)]
    pub infosys: Option<String>,

    /// Query timeout in seconds
    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,

    /// Maximum endpoints kept per host
    #[serde(default = "default_max_endpoints")]
    pub max_endpoints: usize,

    /// Offline endpoint table
    #[serde(default)]
    pub static_endpoints: Vec<StaticEndpoint>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            infosys: None,
            timeout_secs: default_discovery_timeout(),
            max_endpoints: default_max_endpoints(),
            static_endpoints: Vec::new(),
        }
    }
}

impl DiscoverySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One entry of the offline endpoint table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEndpoint {
    pub host: String,
    pub url: String,
    #[serde(default = "default_endpoint_type")]
    pub endpoint_type: String,
}

/// Endpoint cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entry lifetime in seconds; entries never expire when unset
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl CacheSettings {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// Replica catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// URL schemes handled as catalog locations
    #[serde(default = "default_catalog_schemes")]
    pub schemes: Vec<String>,

    /// Mode for directories created during registration
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,

    /// Mode for catalog entries created during registration
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            schemes: default_catalog_schemes(),
            dir_mode: default_dir_mode(),
            file_mode: default_file_mode(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_discovery_timeout() -> u64 {
    60
}

fn default_max_endpoints() -> usize {
    MAX_ENDPOINTS
}

fn default_endpoint_type() -> String {
    "srm_v2".to_string()
}

fn default_catalog_schemes() -> Vec<String> {
    vec!["catalog".to_string(), "lfc".to_string()]
}

fn default_dir_mode() -> u32 {
    0o755
}

fn default_file_mode() -> u32 {
    0o644
}
