//! Conversational agent
//!
//! Conversation state, prompt construction and the tool-calling loop.

pub mod conversation;
pub mod executor;
pub mod prompt;

pub use conversation::ConversationState;
pub use executor::{AgentExecutor, ExecutorOptions, TurnObserver, TurnOutcome, INCOMPLETE_ANSWER};
pub use prompt::{build_prompt, build_system_prompt};
