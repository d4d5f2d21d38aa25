//! Database Manager
//!
//! This module implements the DatabaseManager struct which owns the SQLite
//! handle and provides the catalog and query operations the agent's tools are
//! built on.

use crate::database::connection::{self, DatabaseLocation};
use crate::database::rows::{decode_rows, render_rows};
use crate::error::Result;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{debug, warn};

/// Prefix of the text returned when a query fails
pub const QUERY_ERROR_PREFIX: &str = "The following error occurred:";

/// Database Manager
///
/// Owns the single database handle for the process lifetime. Cloning is cheap
/// and shares the same connection.
#[derive(Clone)]
pub struct DatabaseManager {
    /// Database connection pool (one connection)
    pool: SqlitePool,
    /// Where the database lives
    location: DatabaseLocation,
}

impl DatabaseManager {
    /// Opens the database and wraps it in a manager
    ///
    /// # Example
    /// ```no_run
    /// use sql_agent::database::manager::DatabaseManager;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let manager = DatabaseManager::connect("db.sqlite").await?;
    ///     println!("{}", manager.list_tables().await?);
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        let location = DatabaseLocation::parse(url)?;
        let pool = connection::open(&location).await?;
        Ok(Self::from_pool(pool, location))
    }

    /// Wraps an already open handle
    pub fn from_pool(pool: SqlitePool, location: DatabaseLocation) -> Self {
        Self { pool, location }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database location
    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Returns the names of all tables, one per line
    ///
    /// An empty database yields an empty string.
    pub async fn list_tables(&self) -> Result<String> {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(&self.pool)
            .await?;

        let names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get::<Option<String>, _>(0).ok().flatten())
            .collect();

        Ok(names.join("\n"))
    }

    /// Returns the CREATE statements of the named tables, one per line
    ///
    /// Names that do not match a table contribute nothing.
    pub async fn describe_tables(&self, table_names: &[String]) -> Result<String> {
        if table_names.is_empty() {
            return Ok(String::new());
        }

        let placeholders = vec!["?"; table_names.len()].join(", ");
        let sql = format!(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for name in table_names {
            query = query.bind(name.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;
        let statements: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get::<Option<String>, _>(0).ok().flatten())
            .collect();

        Ok(statements.join("\n"))
    }

    /// Executes an arbitrary statement
    ///
    /// Never fails: any execution error comes back as descriptive text so the
    /// model can correct its query and try again.
    pub async fn run_query(&self, query: &str) -> String {
        debug!(query, "running query");

        let rows = match sqlx::query(query).fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "query failed");
                return format!("{} {}", QUERY_ERROR_PREFIX, describe_sqlx_error(&e));
            }
        };

        match decode_rows(&rows) {
            Ok(values) => render_rows(&values),
            Err(e) => format!("{} {}", QUERY_ERROR_PREFIX, describe_sqlx_error(&e)),
        }
    }
}

/// Prefer the engine's own message over sqlx's wrapper text
fn describe_sqlx_error(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}
