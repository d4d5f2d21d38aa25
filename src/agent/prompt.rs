//! Prompt construction.

use crate::llm::provider::Message;

/// System instruction naming the tables that exist
///
/// Telling the model which tables exist, and that it must look up columns
/// instead of guessing them, keeps it from inventing schema.
pub fn build_system_prompt(tables: &str) -> String {
    let tables = if tables.trim().is_empty() {
        "(none)".to_string()
    } else {
        tables.lines().collect::<Vec<_>>().join(", ")
    };

    format!(
        "You are an AI that has access to a SQLite database.\n\
         The database has tables of: {}\n\
         Do not make any assumptions about what tables exist or what columns exist. \
         Instead, use the 'describe_tables' function.",
        tables
    )
}

/// Full prompt for one model call
///
/// System instruction, then every earlier turn verbatim, then the new input,
/// then this turn's tool exchanges so far.
pub fn build_prompt(
    system_prompt: &str,
    history: &[Message],
    input: &Message,
    scratch: &[Message],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + scratch.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend_from_slice(history);
    messages.push(input.clone());
    messages.extend_from_slice(scratch);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{MessageRole, ToolCall};

    #[test]
    fn test_system_prompt_lists_tables() {
        let prompt = build_system_prompt("users\norders\nproducts");
        assert!(prompt.contains("The database has tables of: users, orders, products"));
        assert!(prompt.contains("describe_tables"));

        let empty = build_system_prompt("");
        assert!(empty.contains("tables of: (none)"));
    }

    #[test]
    fn test_prompt_order() {
        let history = vec![Message::human("earlier"), Message::assistant("reply")];
        let call = ToolCall::new("1", "list_tables", "{}");
        let scratch = vec![
            Message::assistant_tool_call(call.clone()),
            Message::tool_result(call, "orders"),
        ];

        let prompt = build_prompt("sys", &history, &Message::human("now"), &scratch);

        let roles: Vec<MessageRole> = prompt.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::Human,
                MessageRole::Assistant,
                MessageRole::Human,
                MessageRole::Assistant,
                MessageRole::Tool,
            ]
        );
        assert_eq!(prompt[0].content, "sys");
        assert_eq!(prompt[3].content, "now");
    }
}
