//! Configuration Storage
//!
//! This module handles the optional on-disk configuration file holding API
//! keys, model choices and agent limits.

use crate::error::{Result, SqlAgentError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Persistent configuration data
///
/// Every field is optional; unset fields fall back to defaults or the
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Selected provider ("openai" or "anthropic")
    pub provider: Option<String>,
    /// API keys per provider
    pub api_keys: HashMap<String, String>,
    /// Model per provider
    pub models: HashMap<String, String>,
    /// Custom endpoint for the selected provider
    pub base_url: Option<String>,
    /// SQLite database path
    pub database: Option<String>,
    /// Directory reports are written to
    pub report_dir: Option<PathBuf>,
    /// Tool call budget per turn
    pub max_tool_calls: Option<u32>,
    /// Model round-trip deadline in seconds
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                SqlAgentError::Config("Could not find configuration directory".to_string())
            })?
            .join("sql-agent");

        Ok(config_dir)
    }

    /// Get the configuration file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load configuration from the default location
    ///
    /// A missing file yields the empty configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            SqlAgentError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Save configuration to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SqlAgentError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }

    /// Get API key for a provider
    pub fn get_api_key(&self, provider: &str) -> Option<&String> {
        self.api_keys.get(provider)
    }

    /// Get model for a provider
    pub fn get_model(&self, provider: &str) -> Option<&String> {
        self.models.get(provider)
    }
}
