//! LLM integration module
//!
//! This module provides trait-based LLM provider abstraction
//! and implementations for the supported AI services.

pub mod client;
pub mod provider;

// Provider implementations
pub mod providers {
    pub mod anthropic;
    pub mod openai;
}

use crate::config::Settings;
use crate::error::{Result, SqlAgentError};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// Re-exports
pub use provider::{
    GenerationParams, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolDefinition,
};

/// Supported provider APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// OpenAI chat completions (or any compatible endpoint)
    #[default]
    OpenAI,
    /// Anthropic messages
    Anthropic,
}

impl ProviderKind {
    /// Lowercase identifier used in config files
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = SqlAgentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(ProviderKind::OpenAI),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(SqlAgentError::Config(format!(
                "Unsupported provider '{}'. Supported: openai, anthropic",
                other
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Build the configured provider
pub fn create_provider(settings: &Settings) -> Result<Arc<dyn LLMProvider>> {
    let api_key = settings.api_key.clone().unwrap_or_default();

    let provider: Arc<dyn LLMProvider> = match settings.provider {
        ProviderKind::OpenAI => {
            let mut provider = providers::openai::OpenAIProvider::new(api_key, settings.model.clone())?
                .with_timeout(settings.timeout_secs)?;
            if let Some(base_url) = &settings.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Arc::new(provider)
        }
        ProviderKind::Anthropic => {
            let mut provider =
                providers::anthropic::AnthropicProvider::new(api_key, settings.model.clone())?
                    .with_timeout(settings.timeout_secs)?;
            if let Some(base_url) = &settings.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Arc::new(provider)
        }
    };

    provider.validate_config()?;
    Ok(provider)
}
