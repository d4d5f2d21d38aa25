//! Agent loop
//!
//! One turn: build the prompt, call the model, dispatch any tool calls it
//! asks for and call it again, until it answers in plain text or the tool
//! call budget runs out.

use crate::agent::conversation::ConversationState;
use crate::agent::prompt::{build_prompt, build_system_prompt};
use crate::config::Settings;
use crate::database::DatabaseManager;
use crate::error::{Result, SqlAgentError};
use crate::llm::provider::{GenerationParams, LLMProvider, LLMResponse, Message, ToolDefinition};
use crate::tools::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Answer given when the tool call budget is exhausted
pub const INCOMPLETE_ANSWER: &str = "I could not complete this request within the tool call limit.";

/// Loop limits and generation parameters
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum tool dispatches per turn
    pub max_tool_calls: u32,
    /// Deadline for a single model call
    pub model_timeout: Duration,
    pub params: GenerationParams,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_tool_calls: crate::config::DEFAULT_MAX_TOOL_CALLS,
            model_timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            params: GenerationParams::default(),
        }
    }
}

impl ExecutorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_tool_calls: settings.max_tool_calls,
            model_timeout: Duration::from_secs(settings.timeout_secs),
            params: GenerationParams::default(),
        }
    }

    pub fn with_max_tool_calls(mut self, max_tool_calls: u32) -> Self {
        self.max_tool_calls = max_tool_calls;
        self
    }

    pub fn with_model_timeout(mut self, model_timeout: Duration) -> Self {
        self.model_timeout = model_timeout;
        self
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered in plain text
    Answer(String),
    /// The tool call budget ran out
    Incomplete(String),
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Answer(text) | TurnOutcome::Incomplete(text) => text,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, TurnOutcome::Answer(_))
    }
}

/// Hook notified before every model call
pub trait TurnObserver: Send + Sync {
    fn on_prompt(&self, messages: &[Message]);
}

/// Drives turns against a provider and a tool registry
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tools: ToolRegistry,
    system_prompt: String,
    state: ConversationState,
    options: ExecutorOptions,
    observer: Option<Arc<dyn TurnObserver>>,
}

impl AgentExecutor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: ToolRegistry,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            system_prompt: system_prompt.into(),
            state: ConversationState::new(),
            options: ExecutorOptions::default(),
            observer: None,
        }
    }

    /// Executor with the default tools over `database`
    ///
    /// The table list in the system prompt is read once, here.
    pub async fn for_database(
        provider: Arc<dyn LLMProvider>,
        database: DatabaseManager,
        report_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let tables = database.list_tables().await?;
        let tools = ToolRegistry::with_defaults(database, report_dir)?;
        Ok(Self::new(provider, tools, build_system_prompt(&tables)))
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace or remove the prompt observer
    pub fn set_observer(&mut self, observer: Option<Arc<dyn TurnObserver>>) {
        self.observer = observer;
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.state
    }

    pub fn clear_history(&mut self) {
        self.state.clear();
    }

    /// Run one turn for a line of user input
    ///
    /// On success the human message, every tool exchange and the answer are
    /// appended to history. On a provider error the turn's tool exchanges are
    /// dropped and history is left as it was.
    pub async fn run_turn(&mut self, input: &str) -> Result<TurnOutcome> {
        let human = Message::human(input);
        info!(provider = self.provider.provider_name(), "starting turn");

        match self.drive(&human).await {
            Ok(outcome) => {
                self.state
                    .commit_turn(human, Message::assistant(outcome.text()));
                info!(
                    complete = outcome.is_complete(),
                    history = self.state.history().len(),
                    "turn finished"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "turn failed");
                self.state.discard_scratch();
                Err(e)
            }
        }
    }

    async fn drive(&mut self, human: &Message) -> Result<TurnOutcome> {
        let definitions = self.tools.definitions();
        let mut dispatched = 0u32;

        loop {
            let prompt = build_prompt(
                &self.system_prompt,
                self.state.history(),
                human,
                self.state.scratch(),
            );
            if let Some(observer) = &self.observer {
                observer.on_prompt(&prompt);
            }

            let response = self.call_model(&prompt, &definitions).await?;

            if response.tool_calls.is_empty() {
                if response.content.trim().is_empty() {
                    return Err(SqlAgentError::LLMProvider(format!(
                        "{} returned neither text nor tool calls",
                        self.provider.provider_name()
                    )));
                }
                return Ok(TurnOutcome::Answer(response.content));
            }

            for call in response.tool_calls {
                if dispatched >= self.options.max_tool_calls {
                    warn!(
                        limit = self.options.max_tool_calls,
                        tool = %call.name,
                        "tool call budget exhausted"
                    );
                    return Ok(TurnOutcome::Incomplete(INCOMPLETE_ANSWER.to_string()));
                }

                let result = self.tools.dispatch(&call).await;
                dispatched += 1;
                debug!(tool = %call.name, dispatched, result_len = result.len(), "tool call finished");
                self.state.push_exchange(call, result);
            }
        }
    }

    async fn call_model(
        &self,
        prompt: &[Message],
        definitions: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        debug!(messages = prompt.len(), "calling model");

        let call = self
            .provider
            .generate(prompt, definitions, Some(&self.options.params));
        let response = tokio::time::timeout(self.options.model_timeout, call)
            .await
            .map_err(|_| SqlAgentError::ProviderTimeout(self.options.model_timeout.as_secs()))??;

        debug!(
            tool_calls = response.tool_calls.len(),
            tokens = ?response.get_total_tokens(),
            finish_reason = ?response.finish_reason,
            "model responded"
        );
        Ok(response)
    }
}
