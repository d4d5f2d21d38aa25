//! Database module
//!
//! This module owns the SQLite handle and provides the catalog and query
//! operations used by the agent's tools.

pub mod connection;
pub mod manager;
pub mod rows;

// Re-exports
pub use connection::DatabaseLocation;
pub use manager::DatabaseManager;
pub use rows::SqlValue;
