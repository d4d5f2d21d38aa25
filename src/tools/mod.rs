//! Agent tools
//!
//! Tools are named, schema-described operations the model may ask the agent
//! to run. The registry resolves them by name at call time; every failure on
//! the way (unknown name, bad arguments, handler error) becomes text for the
//! model instead of an error for the caller.

pub mod report;
pub mod schema;
pub mod sql;

use crate::database::DatabaseManager;
use crate::error::{Result, SqlAgentError};
use crate::llm::provider::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

pub use schema::{ArgField, ArgKind, ArgumentSchema, ToolArgs};

/// Static description of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    /// Unique tool name
    pub name: &'static str,
    /// What the tool does, shown to the model
    pub description: &'static str,
    /// Declared arguments
    pub arguments: ArgumentSchema,
}

impl ToolSpec {
    /// Provider-facing definition
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.arguments.to_json_schema(),
        }
    }
}

/// A tool the model can call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and arguments
    fn spec(&self) -> &ToolSpec;

    /// Run the tool with validated arguments
    async fn execute(&self, args: ToolArgs) -> Result<String>;
}

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn Tool>>,
    /// Registration order, used for definitions and error messages
    order: Vec<&'static str>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the database tools and the report writer
    pub fn with_defaults(database: DatabaseManager, report_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in sql::sql_tools(database) {
            registry.register(tool)?;
        }
        registry.register(Box::new(report::WriteReportTool::new(report_dir)))?;
        Ok(registry)
    }

    /// Register a tool, rejecting duplicate names
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<()> {
        let name = tool.spec().name;
        if self.tools.contains_key(name) {
            return Err(SqlAgentError::DuplicateTool(name.to_string()));
        }
        self.tools.insert(name, tool);
        self.order.push(name);
        Ok(())
    }

    /// Registered tool names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.order.clone()
    }

    /// Whether a tool with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions sent to the provider
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec().definition())
            .collect()
    }

    /// Resolve, validate and run a tool call
    ///
    /// Errors are typed; use [`ToolRegistry::dispatch`] to get the text the
    /// model should see.
    pub async fn try_dispatch(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .tools
            .get(call.name.as_str())
            .ok_or_else(|| SqlAgentError::UnknownTool(call.name.clone()))?;

        let args = tool.spec().arguments.validate(&call.name, &call.arguments)?;
        tool.execute(args).await
    }

    /// Run a tool call and render the outcome as a tool result
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        debug!(tool = %call.name, arguments = %call.arguments, "dispatching tool call");

        match self.try_dispatch(call).await {
            Ok(output) => output,
            Err(SqlAgentError::UnknownTool(name)) => {
                warn!(tool = %name, "model requested an unknown tool");
                format!(
                    "{} is not a valid tool, try one of [{}].",
                    name,
                    self.order.join(", ")
                )
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                format!("Error: {}", e)
            }
        }
    }
}
