//! Database tools
//!
//! Exposes the catalog and query operations of [`DatabaseManager`] to the
//! model.

use crate::database::DatabaseManager;
use crate::error::Result;
use crate::tools::{ArgField, ArgKind, ArgumentSchema, Tool, ToolArgs, ToolSpec};
use async_trait::async_trait;

pub const RUN_SQLITE_QUERY: &str = "run_sqlite_query";
pub const DESCRIBE_TABLES: &str = "describe_tables";
pub const LIST_TABLES: &str = "list_tables";

/// The three database tools sharing one handle
pub fn sql_tools(database: DatabaseManager) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(RunQueryTool::new(database.clone())),
        Box::new(DescribeTablesTool::new(database.clone())),
        Box::new(ListTablesTool::new(database)),
    ]
}

/// Runs arbitrary SQL
pub struct RunQueryTool {
    spec: ToolSpec,
    database: DatabaseManager,
}

impl RunQueryTool {
    pub fn new(database: DatabaseManager) -> Self {
        Self {
            spec: ToolSpec {
                name: RUN_SQLITE_QUERY,
                description: "Run a sqlite query.",
                arguments: ArgumentSchema::new(vec![ArgField::required(
                    "query",
                    ArgKind::String,
                    "The SQL statement to execute",
                )]),
            },
            database,
        }
    }
}

#[async_trait]
impl Tool for RunQueryTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: ToolArgs) -> Result<String> {
        let query = args.string("query")?;
        Ok(self.database.run_query(&query).await)
    }
}

/// Returns CREATE statements for a set of tables
pub struct DescribeTablesTool {
    spec: ToolSpec,
    database: DatabaseManager,
}

impl DescribeTablesTool {
    pub fn new(database: DatabaseManager) -> Self {
        Self {
            spec: ToolSpec {
                name: DESCRIBE_TABLES,
                description: "Given a list of table names, returns the schema of those tables.",
                arguments: ArgumentSchema::new(vec![ArgField::required(
                    "table_names",
                    ArgKind::StringList,
                    "Names of the tables to describe",
                )]),
            },
            database,
        }
    }
}

#[async_trait]
impl Tool for DescribeTablesTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: ToolArgs) -> Result<String> {
        let table_names = args.string_list("table_names")?;
        self.database.describe_tables(&table_names).await
    }
}

/// Lists table names
pub struct ListTablesTool {
    spec: ToolSpec,
    database: DatabaseManager,
}

impl ListTablesTool {
    pub fn new(database: DatabaseManager) -> Self {
        Self {
            spec: ToolSpec {
                name: LIST_TABLES,
                description: "Returns the names of all tables in the database, one per line.",
                arguments: ArgumentSchema::empty(),
            },
            database,
        }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, _args: ToolArgs) -> Result<String> {
        self.database.list_tables().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::ToolCall;
    use crate::tools::ToolRegistry;

    async fn registry() -> ToolRegistry {
        let database = DatabaseManager::connect(":memory:").await.unwrap();
        database
            .run_query("CREATE TABLE orders (id INTEGER PRIMARY KEY, product TEXT)")
            .await;
        database
            .run_query("INSERT INTO orders (product) VALUES ('lamp'), ('desk'), ('chair')")
            .await;

        let mut registry = ToolRegistry::new();
        for tool in sql_tools(database) {
            registry.register(tool).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_run_query_tool() {
        let registry = registry().await;
        let call = ToolCall::new(
            "1",
            RUN_SQLITE_QUERY,
            r#"{"query": "SELECT COUNT(*) FROM orders"}"#,
        );
        assert_eq!(registry.dispatch(&call).await, "[(3,)]");
    }

    #[tokio::test]
    async fn test_run_query_tool_reports_sql_errors() {
        let registry = registry().await;
        let call = ToolCall::new(
            "1",
            RUN_SQLITE_QUERY,
            r#"{"query": "SELECT shipping_address FROM orders"}"#,
        );
        let result = registry.dispatch(&call).await;
        assert!(result.starts_with("The following error occurred:"));
        assert!(result.contains("shipping_address"));
    }

    #[tokio::test]
    async fn test_describe_tables_tool() {
        let registry = registry().await;
        let call = ToolCall::new("1", DESCRIBE_TABLES, r#"{"table_names": ["orders"]}"#);
        assert_eq!(
            registry.dispatch(&call).await,
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, product TEXT)"
        );

        let call = ToolCall::new("2", DESCRIBE_TABLES, r#"{"table_names": []}"#);
        assert_eq!(registry.dispatch(&call).await, "");
    }

    #[tokio::test]
    async fn test_list_tables_tool() {
        let registry = registry().await;
        let call = ToolCall::new("1", LIST_TABLES, "");
        assert_eq!(registry.dispatch(&call).await, "orders");
    }
}
