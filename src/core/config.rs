//! Configuration parsing and validation.
//!
//! Configuration is loaded from TOML files with programmatic overrides.
//! Sections mirror the pipeline: what to watch, where the store lives, and
//! how to log.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level leasewatch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Watch and classification settings.
    #[serde(default)]
    pub watch: WatchConfig,

    /// etcd connection settings.
    #[serde(default)]
    pub etcd: EtcdConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Watch and classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Key prefix to watch for expiring keys.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Capacity of the expiry event channel.
    ///
    /// A full channel blocks the classifier instead of dropping events.
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,

    /// Time-to-live query timeout in milliseconds (0 disables).
    #[serde(default = "default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            output_capacity: default_output_capacity(),
            oracle_timeout_ms: default_oracle_timeout_ms(),
        }
    }
}

/// etcd connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtcdConfig {
    /// Client endpoints, e.g. "http://127.0.0.1:2379".
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Connection establishment timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-request timeout for unary calls in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Include the event target (module path) in log lines.
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            with_target: default_with_target(),
        }
    }
}

// Default value functions

fn default_prefix() -> String {
    "/my-data/".to_string()
}

fn default_output_capacity() -> usize {
    1
}

fn default_oracle_timeout_ms() -> u64 {
    5_000
}

fn default_endpoints() -> Vec<String> {
    vec!["http://127.0.0.1:2379".to_string()]
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(ref prefix) = overrides.prefix {
            self.watch.prefix = prefix.clone();
        }
        if let Some(ref endpoints) = overrides.endpoints {
            self.etcd.endpoints = endpoints.clone();
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_watch()?;
        self.validate_etcd()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_watch(&self) -> Result<()> {
        if self.watch.prefix.is_empty() {
            anyhow::bail!("watch.prefix must not be empty");
        }

        // tokio channels reject a zero capacity
        if self.watch.output_capacity == 0 {
            anyhow::bail!("watch.output_capacity must be > 0");
        }

        Ok(())
    }

    fn validate_etcd(&self) -> Result<()> {
        if self.etcd.endpoints.is_empty() {
            anyhow::bail!("etcd.endpoints must contain at least one endpoint");
        }

        for endpoint in &self.etcd.endpoints {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                anyhow::bail!(
                    "etcd.endpoints entries must start with http:// or https://, got: {}",
                    endpoint
                );
            }
        }

        if self.etcd.connect_timeout_ms == 0 {
            anyhow::bail!("etcd.connect_timeout_ms must be > 0");
        }

        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

impl WatchConfig {
    /// Oracle timeout as a duration, if enabled.
    pub fn oracle_timeout(&self) -> Option<Duration> {
        (self.oracle_timeout_ms > 0).then(|| Duration::from_millis(self.oracle_timeout_ms))
    }
}

/// Override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override watched prefix.
    pub prefix: Option<String>,
    /// Override etcd endpoints.
    pub endpoints: Option<Vec<String>>,
}
