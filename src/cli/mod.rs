//! CLI module
//!
//! This module provides the command-line interface for sql-agent,
//! including the REPL, command handlers and transcript rendering.

pub mod commands;
pub mod repl;
pub mod transcript;

// Re-exports
pub use commands::Session;
pub use repl::{Repl, GOODBYE};
pub use transcript::TranscriptPrinter;
