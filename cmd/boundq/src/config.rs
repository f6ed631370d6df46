//! Run configuration.
//!
//! Configuration is read from ~/.boundq/config.yaml unless another file is
//! given, then overridden by command line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".boundq";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Parameters of one producer/consumer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Buffer capacity.
    pub capacity: usize,
    /// Number of source items, produced as 1..=items.
    pub items: u32,
    /// Number of consumers sharing the buffer.
    pub consumers: usize,
    /// Simulated work per produced item, in milliseconds.
    pub producer_delay_ms: u64,
    /// Simulated work per consumed item, in milliseconds.
    pub consumer_delay_ms: u64,
    /// How long to wait for each worker to finish.
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            items: 20,
            consumers: 1,
            producer_delay_ms: 10,
            consumer_delay_ms: 20,
            timeout_secs: 5,
        }
    }
}

impl RunConfig {
    /// Gets the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Reads a config file, choosing JSON or YAML by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: RunConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_slice(&data)
                .with_context(|| format!("invalid JSON config {}", path.display()))?,
            _ => serde_yaml::from_slice(&data)
                .with_context(|| format!("invalid YAML config {}", path.display()))?,
        };
        Ok(cfg)
    }

    /// Writes the config, creating parent directories.
    ///
    /// The format follows the extension the same way [`from_file`](Self::from_file)
    /// reads it: JSON for `.json`, YAML otherwise.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            _ => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Checks values that would make a run impossible.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            anyhow::bail!("capacity must be greater than 0");
        }
        if self.consumers == 0 {
            anyhow::bail!("at least one consumer is required");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn producer_delay(&self) -> Option<Duration> {
        non_zero_millis(self.producer_delay_ms)
    }

    pub fn consumer_delay(&self) -> Option<Duration> {
        non_zero_millis(self.consumer_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Loads the run configuration.
///
/// An explicit path must exist. Without one, the default file is used when
/// present and built-in defaults otherwise.
pub fn load_config(custom_path: Option<&str>) -> Result<RunConfig> {
    match custom_path {
        Some(p) => RunConfig::from_file(Path::new(p)),
        None => match RunConfig::default_path() {
            Some(path) if path.exists() => RunConfig::from_file(&path),
            _ => Ok(RunConfig::default()),
        },
    }
}
