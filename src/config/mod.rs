//! Configuration module
//!
//! Resolves the settings the agent runs with: built-in defaults, then the
//! optional config file, then environment variables (a `.env` file is loaded
//! into the environment at startup).

pub mod storage;

use crate::error::{Result, SqlAgentError};
use crate::llm::ProviderKind;
use std::path::PathBuf;
use std::str::FromStr;
use storage::ConfigFile;

/// Default SQLite database
pub const DEFAULT_DATABASE: &str = "db.sqlite";

/// Default report directory
pub const DEFAULT_REPORT_DIR: &str = "reports";

/// Default tool call budget per turn
pub const DEFAULT_MAX_TOOL_CALLS: u32 = 10;

/// Default model round-trip deadline
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Resolved application settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Provider API to talk to
    pub provider: ProviderKind,
    /// API key for the selected provider
    pub api_key: Option<String>,
    /// Model override (provider default when unset)
    pub model: Option<String>,
    /// Custom endpoint
    pub base_url: Option<String>,
    /// SQLite database path
    pub database: String,
    /// Directory reports are written to
    pub report_dir: PathBuf,
    /// Tool call budget per turn
    pub max_tool_calls: u32,
    /// Model round-trip deadline in seconds
    pub timeout_secs: u64,
    /// Print every prompt sent to the model
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            model: None,
            base_url: None,
            database: DEFAULT_DATABASE.to_string(),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verbose: false,
        }
    }
}

impl Settings {
    /// Load settings from the config file and the process environment
    pub fn load() -> Result<Self> {
        let file = ConfigFile::load()?;
        Self::resolve(&file, |key| std::env::var(key).ok())
    }

    /// Resolve settings from a config file and an environment lookup
    pub fn resolve<F>(file: &ConfigFile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        // Config file
        if let Some(provider) = &file.provider {
            settings.provider = provider.parse()?;
        }
        if let Some(database) = &file.database {
            settings.database = database.clone();
        }
        if let Some(report_dir) = &file.report_dir {
            settings.report_dir = report_dir.clone();
        }
        if let Some(max_tool_calls) = file.max_tool_calls {
            settings.max_tool_calls = max_tool_calls;
        }
        if let Some(timeout_secs) = file.timeout_secs {
            settings.timeout_secs = timeout_secs;
        }
        settings.base_url = file.base_url.clone();

        // Environment
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(provider) = env("SQL_AGENT_PROVIDER") {
            settings.provider = provider.parse()?;
        }
        if let Some(database) = env("SQL_AGENT_DATABASE") {
            settings.database = database;
        }
        if let Some(report_dir) = env("SQL_AGENT_REPORT_DIR") {
            settings.report_dir = PathBuf::from(report_dir);
        }
        if let Some(value) = env("SQL_AGENT_MAX_TOOL_CALLS") {
            settings.max_tool_calls = parse_number("SQL_AGENT_MAX_TOOL_CALLS", &value)?;
        }
        if let Some(value) = env("SQL_AGENT_TIMEOUT_SECS") {
            settings.timeout_secs = parse_number("SQL_AGENT_TIMEOUT_SECS", &value)?;
        }
        if let Some(base_url) = env("SQL_AGENT_BASE_URL") {
            settings.base_url = Some(base_url);
        }
        if let Some(verbose) = env("SQL_AGENT_VERBOSE") {
            settings.verbose = matches!(verbose.as_str(), "1" | "true" | "yes" | "on");
        }

        // Provider-specific values depend on the final provider choice
        let provider_id = settings.provider.id();
        settings.api_key = env(settings.provider.api_key_env())
            .or_else(|| file.get_api_key(provider_id).cloned());
        settings.model = env("SQL_AGENT_MODEL").or_else(|| file.get_model(provider_id).cloned());

        if settings.max_tool_calls == 0 {
            return Err(SqlAgentError::Config(
                "max_tool_calls must be at least 1".to_string(),
            ));
        }
        if settings.timeout_secs == 0 {
            return Err(SqlAgentError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(settings)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        SqlAgentError::Config(format!("{} must be a positive integer, got '{}'", key, value))
    })
}
