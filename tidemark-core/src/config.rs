//! Configuration management
//!
//! settings.json format:
//! ```json
//! {
//!   "executor": { "timeoutSeconds": 30 }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    executor: ExecutorSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutorSettings {
    #[serde(default = "default_timeout_secs")]
    timeout_seconds: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Tidemark configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Request timeout for the remote exec_sql RPC, in seconds
    pub request_timeout_secs: u64,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout_secs(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the tidemark directory.
    ///
    /// The RPC timeout can be overridden via TIDEMARK_TIMEOUT_SECS (for
    /// CI/testing against slow tenants).
    pub fn load(tidemark_dir: &Path) -> Result<Self> {
        let settings_path = tidemark_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let request_timeout_secs = std::env::var("TIDEMARK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(raw.executor.timeout_seconds);

        Ok(Self {
            request_timeout_secs,
            _raw_settings: raw,
        })
    }

    /// Save config to the tidemark directory, preserving settings this tool
    /// doesn't manage
    pub fn save(&self, tidemark_dir: &Path) -> Result<()> {
        let settings_path = tidemark_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.executor.timeout_seconds = self.request_timeout_secs;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
