// Agent progress events
//
// Sent while the loop runs so the terminal can show a trace of what the
// agent is doing before the final answer arrives.

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A model round-trip started
    Thinking { turn: usize },
    /// Text the model produced alongside tool calls
    Thought(String),
    ToolCall { name: String, input: Value },
    ToolResult {
        name: String,
        content: String,
        is_error: bool,
    },
    Finished { turns: usize },
}

/// Send if someone is listening; a closed receiver is not an error.
pub(crate) fn emit(events: Option<&UnboundedSender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
