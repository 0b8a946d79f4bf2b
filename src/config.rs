//! Configuration management for eureka-exporter
//!
//! The exporter reads the registry server's own YAML file. Keys are
//! addressed by dot-separated paths (`metric.eureka.enabled`) and resolved
//! into a typed [`Config`].

use serde::Serialize;
use serde_yaml::Value;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// An intermediate key exists but does not hold a mapping
    #[error("Config key '{key}': segment '{segment}' is not a mapping")]
    NotAMapping { key: String, segment: String },

    /// A cluster member address could not be turned into a URL
    #[error("Invalid cluster address '{address}': {reason}")]
    InvalidClusterAddress { address: String, reason: String },

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

const KEY_ENABLED: &str = "metric.eureka.enabled";
const KEY_REGISTRY_PORT: &str = "server.port";
const KEY_CLUSTER: &str = "metric.eureka.cluster";
const KEY_CLUSTER_NAME: &str = "metric.eureka.clusterName";
const KEY_EXPORTER_PORT: &str = "exporter.port";
const KEY_EXPORTER_BIND: &str = "exporter.bind_address";
const KEY_EXPORTER_PATH: &str = "exporter.path";

const DEFAULT_SCHEME: &str = "http://";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    /// Registry scrape configuration
    pub eureka: EurekaConfig,

    /// HTTP server configuration
    pub server: ServerConfig,
}

/// Registry scrape configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EurekaConfig {
    /// Master switch; a disabled collector always yields an empty snapshot
    pub enabled: bool,

    /// Port of the registry on the local host
    pub port: u16,

    /// Registry cluster members, in configured order
    pub cluster: Vec<ScrapeTarget>,

    /// Value of the `eureka_cluster` label
    pub cluster_name: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Metrics endpoint path
    pub path: String,

    /// Server bind address
    pub bind_address: String,
}

/// A registry member base address (`scheme://host:port`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScrapeTarget(String);

impl ScrapeTarget {
    /// Normalize one configured member address.
    ///
    /// Adds `http://` when no scheme is present and drops a single trailing
    /// slash.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let mut address = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("{}{}", DEFAULT_SCHEME, trimmed)
        };
        if address.ends_with('/') {
            address.pop();
        }

        let parsed = url::Url::parse(&address).map_err(|e| ConfigError::InvalidClusterAddress {
            address: raw.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidClusterAddress {
                address: raw.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self(address))
    }

    /// Base address as configured (after normalization)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address without its scheme, e.g. `peer1:8761`
    pub fn authority(&self) -> &str {
        match self.0.find("://") {
            Some(idx) => &self.0[idx + 3..],
            None => &self.0,
        }
    }

    /// URL of the member's status page
    pub fn status_url(&self) -> String {
        format!("{}/eureka/status", self.0)
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Default value functions
fn default_registry_port() -> u16 {
    8761
}

fn default_cluster_name() -> String {
    "default".to_string()
}

fn default_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Default for EurekaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_registry_port(),
            cluster: Vec::new(),
            cluster_name: default_cluster_name(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_metrics_path(),
            bind_address: default_bind_address(),
        }
    }
}

impl EurekaConfig {
    /// Local registry app listing URL
    pub fn apps_url(&self) -> String {
        format!("http://127.0.0.1:{}/eureka/apps", self.port)
    }

    fn from_yaml(root: &Value) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(enabled) = lookup(root, KEY_ENABLED)?.and_then(scalar_to_string) {
            cfg.enabled = enabled.trim().eq_ignore_ascii_case("true");
        }
        if !cfg.enabled {
            return Ok(cfg);
        }

        if let Some(port) = lookup(root, KEY_REGISTRY_PORT)?.and_then(scalar_to_string) {
            cfg.port = parse_port(KEY_REGISTRY_PORT, &port)?;
        }

        match lookup(root, KEY_CLUSTER)? {
            Some(Value::Sequence(items)) => {
                cfg.cluster = items
                    .iter()
                    .filter_map(scalar_to_string)
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| ScrapeTarget::parse(&s))
                    .collect::<Result<_, _>>()?;
            }
            Some(value) => {
                if let Some(list) = scalar_to_string(value) {
                    cfg.cluster = parse_cluster(&list)?;
                }
            }
            None => {}
        }

        if let Some(name) = lookup(root, KEY_CLUSTER_NAME)?.and_then(scalar_to_string) {
            cfg.cluster_name = name;
        }

        Ok(cfg)
    }
}

impl ServerConfig {
    fn from_yaml(root: &Value) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(port) = lookup(root, KEY_EXPORTER_PORT)?.and_then(scalar_to_string) {
            cfg.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("'{}' is not a valid port: {}", KEY_EXPORTER_PORT, port))
            })?;
        }
        if let Some(bind) = lookup(root, KEY_EXPORTER_BIND)?.and_then(scalar_to_string) {
            cfg.bind_address = bind;
        }
        if let Some(path) = lookup(root, KEY_EXPORTER_PATH)?.and_then(scalar_to_string) {
            cfg.path = path;
        }

        Ok(cfg)
    }
}

/// Split a comma-separated member list into scrape targets.
///
/// Blank items are skipped.
pub fn parse_cluster(list: &str) -> Result<Vec<ScrapeTarget>, ConfigError> {
    list.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(ScrapeTarget::parse)
        .collect()
}

/// Resolve a dot-separated key against a nested YAML mapping.
///
/// Returns `Ok(None)` when a segment is missing and
/// [`ConfigError::NotAMapping`] when an intermediate value is a scalar or a
/// sequence.
pub fn lookup<'a>(root: &'a Value, key: &str) -> Result<Option<&'a Value>, ConfigError> {
    let mut current = root;
    for segment in key.split('.') {
        match current {
            Value::Mapping(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return Ok(None),
            },
            Value::Null => return Ok(None),
            _ => {
                return Err(ConfigError::NotAMapping {
                    key: key.to_string(),
                    segment: segment.to_string(),
                })
            }
        }
    }
    Ok(Some(current))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_port(key: &str, raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::ValidationError(format!(
            "'{}' is not a valid port: {}",
            key, raw
        ))),
        Ok(port) => Ok(port),
    }
}

impl Config {
    /// Build a configuration from YAML text
    ///
    /// # Errors
    /// Returns an error if the text is not valid YAML, a key has the wrong
    /// shape, or validation fails
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(contents)?;
        let config = Config {
            eureka: EurekaConfig::from_yaml(&root)?,
            server: ServerConfig::from_yaml(&root)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Metrics path must start with '/'".to_string(),
            ));
        }

        if self.server.path == "/" || self.server.path == "/health" {
            return Err(ConfigError::ValidationError(format!(
                "Metrics path '{}' conflicts with a built-in route",
                self.server.path
            )));
        }

        Ok(())
    }
}
