//! sql-agent library
//!
//! Chat assistant that answers questions about a SQLite database by letting
//! an LLM call database and report tools.
//! The main binary is in src/main.rs.

pub mod agent;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod llm;
pub mod tools;
