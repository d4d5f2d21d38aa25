//! Transcript rendering
//!
//! Draws conversation messages as titled boxes, one colour per role.

use crate::agent::TurnObserver;
use crate::llm::provider::{Message, MessageRole};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

const BOX_WIDTH: u16 = 100;

fn title_and_colour(message: &Message) -> (&'static str, Color) {
    match message.role {
        MessageRole::System => ("System Message", Color::Yellow),
        MessageRole::Human => ("Human Message", Color::Green),
        MessageRole::Assistant if message.is_tool_request() => ("AI Message", Color::Cyan),
        MessageRole::Assistant => ("AI Message", Color::Blue),
        MessageRole::Tool => ("Tool Message", Color::Magenta),
    }
}

/// Text shown inside a message box
pub fn message_body(message: &Message) -> String {
    match (&message.role, &message.tool_call) {
        (MessageRole::Assistant, Some(call)) => {
            format!("Running tool {} with args {}", call.name, call.arguments)
        }
        _ => message.content.clone(),
    }
}

/// One message as a boxed table
pub fn render_message(message: &Message) -> Table {
    let (title, colour) = title_and_colour(message);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(BOX_WIDTH)
        .set_header(vec![Cell::new(title)
            .fg(colour)
            .add_attribute(Attribute::Bold)])
        .add_row(vec![Cell::new(message_body(message)).fg(colour)]);
    table
}

/// A sequence of messages, one box each
pub fn render_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| render_message(message).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints every prompt sent to the model
#[derive(Debug, Default)]
pub struct TranscriptPrinter;

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self
    }
}

impl TurnObserver for TranscriptPrinter {
    fn on_prompt(&self, messages: &[Message]) {
        println!("{}", render_messages(messages));
    }
}
