//! REPL implementation
//!
//! This module implements the interactive Read-Eval-Print Loop for sql-agent.

use crate::cli::commands::{self, format_error, Command, CommandType, Session};
use crate::error::{Result, SqlAgentError};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;
use rustyline::{CompletionType, Config, Editor};
use std::path::PathBuf;
use tracing::debug;

/// Printed when the user interrupts the program
pub const GOODBYE: &str = "You pressed Ctrl+C, goodbye!";

const COMMANDS: &[&str] = &[
    "/tables", "/history", "/clear", "/verbose", "/help", "/quit", "/exit",
];

/// Slash command completer
struct SqlAgentCompleter;

impl Completer for SqlAgentCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<String>), ReadlineError> {
        if line.starts_with('/') {
            let matches: Vec<String> = COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|s| s.to_string())
                .collect();
            Ok((0, matches))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Hinter for SqlAgentCompleter {
    type Hint = String;
}

impl Highlighter for SqlAgentCompleter {}

impl Validator for SqlAgentCompleter {}

impl Helper for SqlAgentCompleter {}

/// Location of the line history file
fn history_path() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".sql-agent").join("history"))
        .unwrap_or_else(|| ".sql-agent-history".into())
}

/// Interactive sql-agent session
pub struct Repl {
    /// The rustyline editor
    editor: Editor<SqlAgentCompleter, DefaultHistory>,
    /// Whether the REPL should continue running
    running: bool,
    session: Session,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(session: Session) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .auto_add_history(true)
            .build();

        let mut editor = Editor::<SqlAgentCompleter, DefaultHistory>::with_config(config)
            .map_err(|e| {
                SqlAgentError::Io(std::io::Error::other(format!(
                    "Failed to initialize editor: {}",
                    e
                )))
            })?;
        editor.set_helper(Some(SqlAgentCompleter));

        let history_path = history_path();
        if let Err(e) = editor.load_history(&history_path) {
            debug!(path = %history_path.display(), error = %e, "no line history loaded");
        }

        Ok(Self {
            editor,
            running: true,
            session,
            history_path,
        })
    }

    /// Run the REPL loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        while self.running {
            match self.editor.readline("> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match Command::parse(line) {
                        Ok(command) => self.handle_command(command).await,
                        Err(e) => println!("{}", format_error(&e)),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", GOODBYE);
                    self.running = false;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    self.running = false;
                }
                Err(err) => {
                    println!("Error: {:?}", err);
                    self.running = false;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn save_history(&mut self) {
        if let Some(parent) = self.history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = self.editor.save_history(&self.history_path) {
            debug!(path = %self.history_path.display(), error = %e, "could not save line history");
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("sql-agent v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "Connected to {}. Ask a question, or type /help for commands.",
            self.session.database().location()
        );
        println!();
    }

    /// Handle a command
    async fn handle_command(&mut self, command: Command) {
        if command.command_type == CommandType::Quit {
            self.running = false;
        }

        match commands::handle_command(&command, &mut self.session).await {
            Ok(msg) => println!("{}", msg),
            Err(e) => println!("{}", format_error(&e)),
        }
    }
}
