//! Anthropic Claude API Provider
//!
//! This module implements the LLMProvider trait for Anthropic's Messages API
//! with tool use.

use crate::error::{Result, SqlAgentError};
use crate::llm::client::{LLMHttpClient, DEFAULT_TIMEOUT_SECS};
use crate::llm::provider::{
    GenerationParams, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Anthropic API base URL
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1/messages";

/// Default model
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Anthropic Claude API provider
pub struct AnthropicProvider {
    /// API key for authentication
    api_key: String,
    /// Model to use (e.g., "claude-3-5-sonnet-20241022")
    model: String,
    /// Messages endpoint
    endpoint: String,
    /// HTTP client for making requests
    client: LLMHttpClient,
    /// API version
    version: String,
    /// Maximum tokens for generation
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `model` - Model identifier (defaults to claude-3-5-sonnet-20241022)
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string()),
            endpoint: ANTHROPIC_API_BASE.to_string(),
            client: LLMHttpClient::with_timeout("Anthropic", DEFAULT_TIMEOUT_SECS)?,
            version: "2023-06-01".to_string(),
            max_tokens: 4096,
        })
    }

    /// Use a different messages endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.endpoint = base_url.into();
        self
    }

    /// Set the HTTP timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self> {
        self.client = LLMHttpClient::with_timeout("Anthropic", timeout_secs)?;
        Ok(self)
    }

    /// Set the maximum tokens for generation
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the API version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Build headers for Anthropic API
    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let headers = LLMHttpClient::add_header(headers, "x-api-key", &self.api_key)?;
        LLMHttpClient::add_header(headers, "anthropic-version", &self.version)
    }

    /// Split out the system prompt and convert the rest to Anthropic format
    ///
    /// Consecutive messages with the same role are merged into one message so
    /// that tool results always sit in the user turn following the tool use.
    fn convert_messages_to_anthropic(
        &self,
        messages: &[Message],
    ) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_parts = Vec::new();
        let mut converted: Vec<AnthropicMessage> = Vec::new();

        for msg in messages {
            let (role, block) = match msg.role {
                MessageRole::System => {
                    system_parts.push(msg.content.clone());
                    continue;
                }
                MessageRole::Human => ("user", ContentBlock::text(&msg.content)),
                MessageRole::Assistant => match &msg.tool_call {
                    Some(call) => ("assistant", ContentBlock::tool_use(call)),
                    None => ("assistant", ContentBlock::text(&msg.content)),
                },
                MessageRole::Tool => (
                    "user",
                    ContentBlock::ToolResult {
                        tool_use_id: msg
                            .tool_call
                            .as_ref()
                            .map(|call| call.id.clone())
                            .unwrap_or_default(),
                        content: msg.content.clone(),
                    },
                ),
            };

            match converted.last_mut() {
                Some(last) if last.role == role => last.content.push(block),
                _ => converted.push(AnthropicMessage {
                    role: role.to_string(),
                    content: vec![block],
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, converted)
    }

    /// Turn content blocks into our response format
    fn convert_response(&self, response: AnthropicResponse) -> LLMResponse {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                ContentBlock::Text { text } => content.push_str(&text),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, input.to_string()));
                }
                ContentBlock::ToolResult { .. } => {}
            }
        }

        LLMResponse {
            content,
            tool_calls,
            model: Some(response.model),
            input_tokens: Some(response.usage.input_tokens),
            output_tokens: Some(response.usage.output_tokens),
            total_tokens: Some(response.usage.input_tokens + response.usage.output_tokens),
            finish_reason: response.stop_reason,
        }
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    /// Generate a response from the Claude API
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: Option<&GenerationParams>,
    ) -> Result<LLMResponse> {
        let max_tokens = params
            .and_then(|p| p.max_tokens)
            .unwrap_or(self.max_tokens);

        let (system, anthropic_messages) = self.convert_messages_to_anthropic(messages);

        let request = AnthropicRequest {
            model: self.model.clone(),
            messages: anthropic_messages,
            max_tokens,
            temperature: params.and_then(|p| p.temperature.map(|t| t as f64)),
            top_p: params.and_then(|p| p.top_p.map(|t| t as f64)),
            system,
            tools: tools
                .iter()
                .map(|tool| AnthropicTool {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.parameters.clone(),
                })
                .collect(),
            stream: false,
        };

        let headers = self.build_headers()?;
        let response_text = self
            .client
            .post_with_retry(&self.endpoint, headers, &request)
            .await?;

        let anthropic_response: AnthropicResponse =
            serde_json::from_str(&response_text).map_err(|e| SqlAgentError::LLMApiError {
                provider: "Anthropic".to_string(),
                message: format!("Failed to parse response: {}", e),
                status: 0,
            })?;

        Ok(self.convert_response(anthropic_response))
    }

    /// Get provider name
    fn provider_name(&self) -> &str {
        "Anthropic"
    }

    /// Check if API key is set
    fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
    stream: bool,
}

/// Anthropic API message format
#[derive(Debug, Serialize, Clone)]
struct AnthropicMessage {
    role: String,
    content: Vec<ContentBlock>,
}

/// Tool declaration
#[derive(Debug, Serialize, Clone)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

/// Content block, both in requests and responses
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

impl ContentBlock {
    fn text(text: &str) -> Self {
        ContentBlock::Text {
            text: text.to_string(),
        }
    }

    fn tool_use(call: &ToolCall) -> Self {
        let input = serde_json::from_str(&call.arguments)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
        ContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input,
        }
    }
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new("test-key", None).unwrap()
    }

    #[test]
    fn test_anthropic_provider_creation() {
        let provider = provider();
        assert_eq!(provider.model, ANTHROPIC_DEFAULT_MODEL);
        assert_eq!(provider.max_tokens, 4096);
    }

    #[test]
    fn test_anthropic_provider_with_custom_model() {
        let provider =
            AnthropicProvider::new("test-key", Some("claude-3-opus".to_string())).unwrap();
        assert_eq!(provider.model, "claude-3-opus");
    }

    #[test]
    fn test_anthropic_provider_with_version() {
        let provider = provider().with_version("2024-01-01");
        assert_eq!(provider.version, "2024-01-01");
        let headers = provider.build_headers().unwrap();
        assert_eq!(headers.get("anthropic-version").unwrap(), "2024-01-01");
        assert_eq!(headers.get("x-api-key").unwrap(), "test-key");
    }

    #[test]
    fn test_message_conversion_hoists_system_and_merges_roles() {
        let provider = provider();
        let first = ToolCall::new("toolu_1", "list_tables", "{}");
        let second = ToolCall::new("toolu_2", "describe_tables", r#"{"table_names":["orders"]}"#);

        let messages = vec![
            Message::system("You are an AI that has access to a SQLite database."),
            Message::human("Describe the orders table"),
            Message::assistant_tool_call(first.clone()),
            Message::tool_result(first, "orders"),
            Message::assistant_tool_call(second.clone()),
            Message::tool_result(second, "CREATE TABLE orders (id INTEGER)"),
            Message::assistant("It has an id column."),
        ];

        let (system, converted) = provider.convert_messages_to_anthropic(&messages);
        assert_eq!(
            system.as_deref(),
            Some("You are an AI that has access to a SQLite database.")
        );

        let value = serde_json::to_value(&converted).unwrap();
        assert_eq!(converted.len(), 6);
        assert_eq!(value[0]["role"], "user");
        assert_eq!(value[0]["content"][0]["type"], "text");
        assert_eq!(value[1]["role"], "assistant");
        assert_eq!(value[1]["content"][0]["type"], "tool_use");
        assert_eq!(value[1]["content"][0]["input"], json!({}));
        assert_eq!(value[2]["role"], "user");
        assert_eq!(value[2]["content"][0]["type"], "tool_result");
        assert_eq!(value[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(value[3]["content"][0]["input"]["table_names"][0], "orders");
        assert_eq!(value[5]["content"][0]["text"], "It has an id column.");
    }

    #[test]
    fn test_consecutive_tool_results_share_a_user_turn() {
        let provider = provider();
        let call = ToolCall::new("toolu_1", "list_tables", "{}");
        let messages = vec![
            Message::tool_result(call.clone(), "a"),
            Message::tool_result(call, "b"),
        ];

        let (_, converted) = provider.convert_messages_to_anthropic(&messages);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].content.len(), 2);
    }

    #[test]
    fn test_response_with_tool_use() {
        let body = json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "text", "text": "Let me count them."},
                {
                    "type": "tool_use",
                    "id": "toolu_9",
                    "name": "run_sqlite_query",
                    "input": {"query": "SELECT COUNT(*) FROM orders"}
                }
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 20, "output_tokens": 7}
        });

        let parsed: AnthropicResponse = serde_json::from_value(body).unwrap();
        let response = provider().convert_response(parsed);

        assert_eq!(response.content, "Let me count them.");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "toolu_9");
        let args: serde_json::Value =
            serde_json::from_str(&response.tool_calls[0].arguments).unwrap();
        assert_eq!(args["query"], "SELECT COUNT(*) FROM orders");
        assert_eq!(response.total_tokens, Some(27));
    }

    #[test]
    fn test_has_api_key() {
        assert!(provider().has_api_key());

        let provider = AnthropicProvider::new("", None).unwrap();
        assert!(!provider.has_api_key());
    }
}
