use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::filter::DatePreset;

/// Settings read from an optional JSON file; every key may be omitted.
///
/// ```json
/// {
///   "api_base_url": "https://forms.example.com",
///   "timeout_secs": 30,
///   "connect_timeout_secs": 10,
///   "export_dir": "exports",
///   "default_range": "7d"
/// }
/// ```
///
/// Command-line flags take precedence over these values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub export_dir: PathBuf,
    pub default_range: DatePreset,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            data_dir: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            export_dir: PathBuf::from("exports"),
            default_range: DatePreset::Last7Days,
        }
    }
}

impl AppConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map(Self::load).unwrap_or_else(|| Ok(Self::default()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
