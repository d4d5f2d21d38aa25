//! Tool argument schemas
//!
//! Each tool declares a typed field list. The list is serialized to JSON
//! Schema for the provider and used to validate and coerce the raw argument
//! payload the model sends back.

use crate::error::{Result, SqlAgentError};
use serde_json::{json, Map, Value};

/// Type of a single argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Free text
    String,
    /// List of strings
    StringList,
    /// Any JSON value
    Json,
}

/// One declared argument
#[derive(Debug, Clone, PartialEq)]
pub struct ArgField {
    pub name: &'static str,
    pub kind: ArgKind,
    pub description: &'static str,
    pub required: bool,
}

impl ArgField {
    /// A required argument
    pub fn required(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }

    /// An optional argument
    pub fn optional(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }

    fn json_schema(&self) -> Value {
        match self.kind {
            ArgKind::String => json!({
                "type": "string",
                "description": self.description,
            }),
            ArgKind::StringList => json!({
                "type": "array",
                "items": {"type": "string"},
                "description": self.description,
            }),
            ArgKind::Json => json!({
                "description": self.description,
            }),
        }
    }

    /// Coerce a supplied value into this field's type
    fn coerce(&self, value: Value) -> std::result::Result<Value, String> {
        match (self.kind, value) {
            (ArgKind::String, Value::String(s)) => Ok(Value::String(s)),
            (ArgKind::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (ArgKind::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (ArgKind::String, other) => Err(format!(
                "field '{}' must be a string, got {}",
                self.name,
                type_name(&other)
            )),

            (ArgKind::StringList, Value::String(s)) => Ok(Value::Array(vec![Value::String(s)])),
            (ArgKind::StringList, Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(Value::String(s)),
                    Value::Number(n) => Ok(Value::String(n.to_string())),
                    other => Err(format!(
                        "field '{}' must contain only strings, found {}",
                        self.name,
                        type_name(&other)
                    )),
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array),
            (ArgKind::StringList, other) => Err(format!(
                "field '{}' must be a list of strings, got {}",
                self.name,
                type_name(&other)
            )),

            // Models sometimes send structured data as an encoded string
            (ArgKind::Json, Value::String(s)) => {
                Ok(serde_json::from_str(&s).unwrap_or(Value::String(s)))
            }
            (ArgKind::Json, other) => Ok(other),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Declared arguments of a tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    pub fields: Vec<ArgField>,
}

impl ArgumentSchema {
    /// Schema with no arguments
    pub fn empty() -> Self {
        Self::default()
    }

    /// Schema from a field list
    pub fn new(fields: Vec<ArgField>) -> Self {
        Self { fields }
    }

    /// JSON Schema for the provider
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.to_string(), field.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Parse, validate and coerce a raw argument payload
    ///
    /// A blank payload counts as `{}`. Undeclared fields are dropped.
    pub fn validate(&self, tool: &str, raw: &str) -> Result<ToolArgs> {
        let parsed: Value = if raw.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(raw).map_err(|e| {
                SqlAgentError::invalid_arguments(tool, format!("arguments are not valid JSON: {}", e))
            })?
        };

        let mut supplied = match parsed {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(SqlAgentError::invalid_arguments(
                    tool,
                    format!("arguments must be a JSON object, got {}", type_name(&other)),
                ))
            }
        };

        let mut values = Map::new();
        for field in &self.fields {
            match supplied.remove(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(SqlAgentError::invalid_arguments(
                            tool,
                            format!("missing required field '{}'", field.name),
                        ));
                    }
                }
                Some(value) => {
                    let coerced = field
                        .coerce(value)
                        .map_err(|message| SqlAgentError::invalid_arguments(tool, message))?;
                    values.insert(field.name.to_string(), coerced);
                }
            }
        }

        Ok(ToolArgs {
            tool: tool.to_string(),
            values,
        })
    }
}

/// Validated tool arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArgs {
    tool: String,
    values: Map<String, Value>,
}

impl ToolArgs {
    /// Get a string argument
    pub fn string(&self, name: &str) -> Result<String> {
        match self.values.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(self.missing(name)),
        }
    }

    /// Get a string list argument
    pub fn string_list(&self, name: &str) -> Result<Vec<String>> {
        match self.values.get(name) {
            Some(Value::Array(items)) => Ok(items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()),
            _ => Err(self.missing(name)),
        }
    }

    /// Get a JSON argument
    pub fn json(&self, name: &str) -> Result<&Value> {
        self.values.get(name).ok_or_else(|| self.missing(name))
    }

    fn missing(&self, name: &str) -> SqlAgentError {
        SqlAgentError::invalid_arguments(&self.tool, format!("missing field '{}'", name))
    }
}
