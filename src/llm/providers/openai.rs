//! OpenAI API Provider
//!
//! This module implements the LLMProvider trait for OpenAI's chat completions
//! API with function calling. Any OpenAI-compatible endpoint can be used by
//! overriding the base URL.

use crate::error::{Result, SqlAgentError};
use crate::llm::client::{LLMHttpClient, DEFAULT_TIMEOUT_SECS};
use crate::llm::provider::{
    GenerationParams, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolDefinition,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// OpenAI chat completions endpoint
const OPENAI_API_BASE: &str = "https://api.openai.com/v1/chat/completions";

/// Default model
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI GPT API provider
pub struct OpenAIProvider {
    /// API key for authentication
    api_key: String,
    /// Model to use (e.g., "gpt-4o", "gpt-4o-mini")
    model: String,
    /// Chat completions URL
    endpoint: String,
    /// HTTP client for making requests
    client: LLMHttpClient,
    /// Maximum tokens for generation
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model identifier (defaults to gpt-4o-mini)
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            endpoint: OPENAI_API_BASE.to_string(),
            client: LLMHttpClient::with_timeout("OpenAI", DEFAULT_TIMEOUT_SECS)?,
            max_tokens: 4096,
        })
    }

    /// Point the provider at an OpenAI-compatible endpoint
    ///
    /// Accepts either a full `.../chat/completions` URL or an API root such as
    /// `https://api.groq.com/openai/v1`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/');
        self.endpoint = if trimmed.ends_with("/chat/completions") {
            trimmed.to_string()
        } else {
            format!("{}/chat/completions", trimmed)
        };
        self
    }

    /// Set the HTTP timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self> {
        self.client = LLMHttpClient::with_timeout("OpenAI", timeout_secs)?;
        Ok(self)
    }

    /// Set the maximum tokens for generation
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Convert our Message format to OpenAI format
    fn convert_messages_to_openai(&self, messages: &[Message]) -> Vec<OpenAIMessage> {
        messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System => OpenAIMessage::text("system", &msg.content),
                MessageRole::Human => OpenAIMessage::text("user", &msg.content),
                MessageRole::Assistant => match &msg.tool_call {
                    Some(call) => OpenAIMessage {
                        role: "assistant".to_string(),
                        content: None,
                        tool_calls: Some(vec![OpenAIToolCall::from(call)]),
                        tool_call_id: None,
                    },
                    None => OpenAIMessage::text("assistant", &msg.content),
                },
                MessageRole::Tool => OpenAIMessage {
                    role: "tool".to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: msg.tool_call.as_ref().map(|call| call.id.clone()),
                },
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI function tools
    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAITool> {
        tools
            .iter()
            .map(|tool| OpenAITool {
                type_: "function".to_string(),
                function: OpenAIFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect()
    }

    /// Turn the first choice into our response format
    fn convert_response(&self, response: OpenAIResponse) -> Result<LLMResponse> {
        let usage = response.usage;
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            SqlAgentError::LLMApiError {
                provider: "OpenAI".to_string(),
                message: "Response contained no choices".to_string(),
                status: 0,
            }
        })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
            .collect();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            input_tokens: usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens: usage.as_ref().map(|u| u.completion_tokens),
            total_tokens: usage.as_ref().map(|u| u.total_tokens),
            model: response.model,
            finish_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    /// Generate a response from the chat completions API
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: Option<&GenerationParams>,
    ) -> Result<LLMResponse> {
        let max_tokens = params
            .and_then(|p| p.max_tokens)
            .unwrap_or(self.max_tokens);

        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: self.convert_messages_to_openai(messages),
            tools: if tools.is_empty() {
                None
            } else {
                Some(self.convert_tools(tools))
            },
            max_tokens: Some(max_tokens),
            temperature: params.and_then(|p| p.temperature),
            top_p: params.and_then(|p| p.top_p),
        };

        let headers = LLMHttpClient::build_headers(&self.api_key)?;
        let response_text = self
            .client
            .post_with_retry(&self.endpoint, headers, &request)
            .await?;

        let openai_response: OpenAIResponse =
            serde_json::from_str(&response_text).map_err(|e| SqlAgentError::LLMApiError {
                provider: "OpenAI".to_string(),
                message: format!("Failed to parse response: {}", e),
                status: 0,
            })?;

        self.convert_response(openai_response)
    }

    /// Get provider name
    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    /// Check if API key is set
    fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// OpenAI API message format
#[derive(Debug, Serialize, Clone)]
struct OpenAIMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAIMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Function tool declaration
#[derive(Debug, Serialize, Clone)]
struct OpenAITool {
    #[serde(rename = "type")]
    type_: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Tool call, both in requests and responses
#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    type_: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

impl From<&ToolCall> for OpenAIToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            type_: function_type(),
            function: OpenAIFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

/// Choice in OpenAI response
#[derive(Debug, Deserialize)]
struct Choice {
    message: OpenAIMessageResponse,
    finish_reason: Option<String>,
}

/// Message in OpenAI response
#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new("test-key", None).unwrap()
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = provider();
        assert_eq!(provider.model, OPENAI_DEFAULT_MODEL);
        assert_eq!(provider.max_tokens, 4096);
        assert_eq!(provider.endpoint, OPENAI_API_BASE);
    }

    #[test]
    fn test_base_url_override() {
        let groq = provider().with_base_url("https://api.groq.com/openai/v1/");
        assert_eq!(
            groq.endpoint,
            "https://api.groq.com/openai/v1/chat/completions"
        );

        let provider = provider().with_base_url("http://localhost:8080/v1/chat/completions");
        assert_eq!(provider.endpoint, "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_message_conversion() {
        let provider = provider();
        let call = ToolCall::new("call_1", "run_sqlite_query", r#"{"query":"SELECT 1"}"#);

        let messages = vec![
            Message::system("You are an AI that has access to a SQLite database."),
            Message::human("How many orders are there?"),
            Message::assistant_tool_call(call.clone()),
            Message::tool_result(call, "[(1,)]"),
            Message::assistant("There is 1 order."),
        ];

        let converted = provider.convert_messages_to_openai(&messages);
        let value = serde_json::to_value(&converted).unwrap();

        assert_eq!(value[0]["role"], "system");
        assert_eq!(value[1]["role"], "user");
        assert_eq!(value[2]["role"], "assistant");
        assert!(value[2]["content"].is_null());
        assert_eq!(value[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(value[2]["tool_calls"][0]["type"], "function");
        assert_eq!(
            value[2]["tool_calls"][0]["function"]["name"],
            "run_sqlite_query"
        );
        assert_eq!(value[3]["role"], "tool");
        assert_eq!(value[3]["tool_call_id"], "call_1");
        assert_eq!(value[3]["content"], "[(1,)]");
        assert_eq!(value[4]["content"], "There is 1 order.");
    }

    #[test]
    fn test_tool_conversion() {
        let provider = provider();
        let tools = vec![ToolDefinition {
            name: "list_tables".to_string(),
            description: "List tables".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];

        let value = serde_json::to_value(provider.convert_tools(&tools)).unwrap();
        assert_eq!(value[0]["type"], "function");
        assert_eq!(value[0]["function"]["name"], "list_tables");
        assert_eq!(value[0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let body = json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "run_sqlite_query",
                            "arguments": "{\"query\": \"SELECT COUNT(*) FROM orders\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 50, "completion_tokens": 10, "total_tokens": 60}
        });

        let parsed: OpenAIResponse = serde_json::from_value(body).unwrap();
        let response = provider().convert_response(parsed).unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "call_abc");
        assert_eq!(response.tool_calls[0].name, "run_sqlite_query");
        assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.get_total_tokens(), Some(60));
    }

    #[test]
    fn test_response_without_choices() {
        let parsed: OpenAIResponse =
            serde_json::from_value(json!({"model": "gpt-4o", "choices": []})).unwrap();
        assert!(provider().convert_response(parsed).is_err());
    }

    #[test]
    fn test_has_api_key() {
        assert!(provider().has_api_key());

        let provider = OpenAIProvider::new("", None).unwrap();
        assert!(!provider.has_api_key());
        assert!(provider.validate_config().is_err());
    }
}
