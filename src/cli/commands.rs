//! Command handlers for CLI
//!
//! This module implements the `/` commands of the REPL and routes every other
//! line to the agent.

use crate::agent::{AgentExecutor, TurnObserver};
use crate::cli::transcript::{render_messages, TranscriptPrinter};
use crate::database::DatabaseManager;
use crate::error::{Result, SqlAgentError};
use std::sync::Arc;

/// Command types
#[derive(Debug, Clone, PartialEq)]
pub enum CommandType {
    /// List the database tables
    Tables,
    /// Drop the conversation history
    Clear,
    /// Show the conversation history
    History,
    /// Toggle or set prompt printing
    Verbose { enabled: Option<bool> },
    /// Show help message
    Help,
    /// Exit the application
    Quit,
    /// Question for the agent
    Query { text: String },
}

/// Parsed command
#[derive(Debug, Clone)]
pub struct Command {
    /// The type of command
    pub command_type: CommandType,
}

impl Command {
    /// Parse a command from user input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if !input.starts_with('/') {
            return Ok(Command {
                command_type: CommandType::Query {
                    text: input.to_string(),
                },
            });
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts[0];

        let command_type = match cmd {
            "/tables" => CommandType::Tables,
            "/clear" => CommandType::Clear,
            "/history" => CommandType::History,
            "/verbose" => {
                let enabled = match parts.get(1).copied() {
                    None => None,
                    Some("on") => Some(true),
                    Some("off") => Some(false),
                    Some(_) => {
                        return Err(SqlAgentError::InvalidCommandSyntax {
                            command: cmd.to_string(),
                            expected: "/verbose [on|off]".to_string(),
                        })
                    }
                };
                CommandType::Verbose { enabled }
            }
            "/help" => CommandType::Help,
            "/quit" | "/exit" => CommandType::Quit,
            _ => return Err(SqlAgentError::UnknownCommand(cmd.to_string())),
        };

        Ok(Command { command_type })
    }
}

/// Everything a command can act on
pub struct Session {
    executor: AgentExecutor,
    database: DatabaseManager,
    transcript: Arc<TranscriptPrinter>,
}

impl Session {
    pub fn new(executor: AgentExecutor, database: DatabaseManager) -> Self {
        Self {
            executor,
            database,
            transcript: Arc::new(TranscriptPrinter::new()),
        }
    }

    /// Print every prompt sent to the model
    pub fn set_verbose(&mut self, verbose: bool) {
        let observer = verbose.then(|| self.transcript.clone() as Arc<dyn TurnObserver>);
        self.executor.set_observer(observer);
    }

    pub fn is_verbose(&self) -> bool {
        self.executor.has_observer()
    }

    pub fn executor(&self) -> &AgentExecutor {
        &self.executor
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    /// Run one question through the agent and return its answer
    pub async fn ask(&mut self, text: &str) -> Result<String> {
        let outcome = self.executor.run_turn(text).await?;
        Ok(outcome.text().to_string())
    }
}

/// Handle a command and return the result message
pub async fn handle_command(command: &Command, session: &mut Session) -> Result<String> {
    match &command.command_type {
        CommandType::Tables => {
            let tables = session.database.list_tables().await?;
            if tables.is_empty() {
                Ok("No tables.".to_string())
            } else {
                Ok(tables)
            }
        }
        CommandType::Clear => {
            session.executor.clear_history();
            Ok("✓ Conversation history cleared".to_string())
        }
        CommandType::History => {
            let history = session.executor.conversation().history();
            if history.is_empty() {
                Ok("No conversation yet.".to_string())
            } else {
                Ok(render_messages(history))
            }
        }
        CommandType::Verbose { enabled } => {
            let verbose = enabled.unwrap_or(!session.is_verbose());
            session.set_verbose(verbose);
            Ok(format!(
                "✓ Prompt printing {}",
                if verbose { "enabled" } else { "disabled" }
            ))
        }
        CommandType::Help => Ok(HELP.to_string()),
        CommandType::Quit => Ok("Goodbye!".to_string()),
        CommandType::Query { text } => session.ask(text).await,
    }
}

const HELP: &str = r#"
sql-agent Commands

Database:
  /tables            List the tables in the database

Session:
  /history           Show the conversation so far
  /clear             Forget the conversation history
  /verbose [on|off]  Print every prompt sent to the model
  /help              Show this help message
  /quit, /exit       Exit sql-agent

Questions:
  Any text without a / prefix is a question about the database.

Examples:
  How many orders are there? Write the result to an html report.
  Repeat the same process for users.
"#;

/// Format an error for display
pub fn format_error(error: &SqlAgentError) -> String {
    format!("Error: {}", error)
}
