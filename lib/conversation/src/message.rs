//! Message types for conversations.

use serde::{Deserialize, Serialize};
use taskmate_ai::LlmMessage;

pub use taskmate_ai::ToolCall;

/// One entry of a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// Something the user said.
    User { text: String },
    /// A model reply. Non-empty `tool_calls` must be answered before the
    /// model is invoked again.
    Model {
        text: String,
        tool_calls: Vec<ToolCall>,
    },
    /// The result of one tool call, serialized for the model.
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        content: String,
    },
}

impl Message {
    /// Creates a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    /// Creates a model text reply.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self::Model {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a tool result for `call`.
    #[must_use]
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            content: content.into(),
        }
    }

    /// Returns the tool calls carried by a model message.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Model { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Returns true if this is a user message with exactly `text`.
    #[must_use]
    pub fn is_user_text(&self, text: &str) -> bool {
        matches!(self, Self::User { text: t } if t == text)
    }
}

impl From<&Message> for LlmMessage {
    fn from(message: &Message) -> Self {
        match message {
            Message::User { text } => Self::User {
                content: text.clone(),
            },
            Message::Model { text, tool_calls } => Self::Assistant {
                content: text.clone(),
                tool_calls: tool_calls.clone(),
            },
            Message::ToolResult {
                tool_call_id,
                tool_name,
                content,
            } => Self::Tool {
                tool_call_id: tool_call_id.clone(),
                name: tool_name.clone(),
                content: content.clone(),
            },
        }
    }
}
