//! Database connection
//!
//! Opens the single SQLite handle shared by every tool for the lifetime of the
//! process. The handle is a one-connection sqlx pool so that the same
//! connection (and, for `:memory:` databases, the same data) is reused by
//! every statement.

use crate::error::{Result, SqlAgentError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;

/// Location of the SQLite database to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// File-backed database (created if missing)
    File(PathBuf),
    /// Private in-memory database
    Memory,
}

impl DatabaseLocation {
    /// Parse a path or `sqlite:` url
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(SqlAgentError::Config(
                "Database path must not be empty".to_string(),
            ));
        }

        // Strip the sqlite:// or sqlite: prefix
        let path = if let Some(stripped) = trimmed.strip_prefix("sqlite://") {
            stripped
        } else if let Some(stripped) = trimmed.strip_prefix("sqlite:") {
            stripped
        } else {
            trimmed
        };

        if path == ":memory:" {
            Ok(DatabaseLocation::Memory)
        } else {
            Ok(DatabaseLocation::File(PathBuf::from(path)))
        }
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        match self {
            DatabaseLocation::File(path) => Ok(SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)),
            DatabaseLocation::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| SqlAgentError::db_connection(":memory:", e)),
        }
    }
}

impl std::fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseLocation::File(path) => write!(f, "{}", path.display()),
            DatabaseLocation::Memory => write!(f, ":memory:"),
        }
    }
}

/// Open the shared database handle
pub async fn open(location: &DatabaseLocation) -> Result<SqlitePool> {
    let options = location.connect_options()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| SqlAgentError::db_connection(location.to_string(), e))?;

    // Test the connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| SqlAgentError::db_connection(location.to_string(), e))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            DatabaseLocation::parse("db.sqlite").unwrap(),
            DatabaseLocation::File(PathBuf::from("db.sqlite"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite://data/shop.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("data/shop.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite:shop.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("shop.db"))
        );
        assert_eq!(
            DatabaseLocation::parse(":memory:").unwrap(),
            DatabaseLocation::Memory
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite::memory:").unwrap(),
            DatabaseLocation::Memory
        );
    }

    #[test]
    fn test_empty_location() {
        assert!(DatabaseLocation::parse("  ").is_err());
    }

    #[tokio::test]
    async fn test_memory_database_keeps_data() {
        let pool = open(&DatabaseLocation::Memory).await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES (1)")
            .execute(&pool)
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.sqlite");
        let _pool = open(&DatabaseLocation::File(path.clone())).await.unwrap();
        assert!(path.exists());
    }
}
