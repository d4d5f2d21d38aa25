//! Conversation state
//!
//! Permanent history of resolved turns plus the scratch buffer of tool
//! exchanges for the turn in progress.

use crate::llm::provider::{Message, MessageRole, ToolCall};

/// History and in-progress tool exchanges
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    history: Vec<Message>,
    scratch: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of all resolved turns, oldest first
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Tool exchanges of the current turn
    pub fn scratch(&self) -> &[Message] {
        &self.scratch
    }

    /// Record one tool call and its result
    ///
    /// The request and the result are always appended together, so a tool
    /// message never appears without the assistant message that asked for it.
    pub fn push_exchange(&mut self, call: ToolCall, result: impl Into<String>) {
        self.scratch.push(Message::assistant_tool_call(call.clone()));
        self.scratch.push(Message::tool_result(call, result));
    }

    /// Number of tool exchanges in the current turn
    pub fn exchange_count(&self) -> usize {
        self.scratch
            .iter()
            .filter(|msg| msg.role == MessageRole::Tool)
            .count()
    }

    /// Move a resolved turn into history and clear the scratch buffer
    pub fn commit_turn(&mut self, input: Message, answer: Message) {
        self.history.push(input);
        self.history.append(&mut self.scratch);
        self.history.push(answer);
    }

    /// Drop the in-progress tool exchanges
    pub fn discard_scratch(&mut self) {
        self.scratch.clear();
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.history.clear();
        self.scratch.clear();
    }
}

/// Check that every tool message directly follows the assistant message that
/// requested the same call
pub fn tool_messages_are_paired(messages: &[Message]) -> bool {
    messages.iter().enumerate().all(|(i, msg)| {
        if msg.role != MessageRole::Tool {
            return true;
        }
        let Some(answered) = &msg.tool_call else {
            return false;
        };
        match i.checked_sub(1).map(|prev| &messages[prev]) {
            Some(prev) if prev.is_tool_request() => prev
                .tool_call
                .as_ref()
                .is_some_and(|requested| requested.id == answered.id && requested.name == answered.name),
            _ => false,
        }
    })
}
