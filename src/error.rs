//! Error types for sql-agent
//!
//! This module defines the error types used throughout the application.
//! Tool-level failures (bad SQL, unknown tools, malformed arguments) are turned
//! into text for the model by the agent loop; only provider failures reach the
//! user as errors.

use thiserror::Error;

/// Result type alias for sql-agent
pub type Result<T> = std::result::Result<T, SqlAgentError>;

/// Main error type for sql-agent
#[derive(Error, Debug)]
pub enum SqlAgentError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to open the database file
    #[error("Failed to connect to database '{url}': {source}")]
    DatabaseConnection {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP-related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    /// Non-success response from an LLM API
    #[error("{provider} API error (status {status}): {message}")]
    LLMApiError {
        provider: String,
        message: String,
        status: u16,
    },

    /// No API key configured for the selected provider
    #[error("No API key configured for provider: {0}")]
    LLMApiKeyMissing(String),

    /// The model did not answer within the configured deadline
    #[error("LLM provider did not respond within {0} seconds")]
    ProviderTimeout(u64),

    /// Invalid HTTP header value
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The model requested a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments failed schema validation
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// A tool with the same name is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Unknown slash command
    #[error("Unknown command: {0}. Type /help for available commands.")]
    UnknownCommand(String),

    /// Slash command with missing or malformed arguments
    #[error("Invalid syntax for {command}. Expected: {expected}")]
    InvalidCommandSyntax { command: String, expected: String },
}

impl SqlAgentError {
    /// Build a connection error for the given database url
    pub fn db_connection(url: impl Into<String>, source: sqlx::Error) -> Self {
        SqlAgentError::DatabaseConnection {
            url: url.into(),
            source,
        }
    }

    /// Build an argument validation error
    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        SqlAgentError::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from talking to the LLM provider
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            SqlAgentError::Http(_)
                | SqlAgentError::LLMProvider(_)
                | SqlAgentError::LLMApiError { .. }
                | SqlAgentError::LLMApiKeyMissing(_)
                | SqlAgentError::ProviderTimeout(_)
        )
    }
}
