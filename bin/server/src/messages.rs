//! WebSocket frame types.
//!
//! Every frame is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};
use taskmate_tasks::Task;

/// Sent to the client when a turn fails.
pub const GENERIC_ERROR: &str = "An unexpected error occurred. Please try again.";

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A user utterance for the agent.
    ChatMessage { content: String },
    /// Forget this connection's conversation.
    ClearHistory,
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A reply to the connection that asked.
    ChatMessage { sender: String, content: String },
    /// The full task list, newest first. Broadcast after writes.
    TaskListUpdate { tasks: Vec<Task> },
    /// Acknowledges `clear_history`.
    HistoryCleared,
    /// Something went wrong with the last frame.
    Error { message: String },
}

impl ServerMessage {
    /// Creates a chat message from the agent.
    #[must_use]
    pub fn agent(content: impl Into<String>) -> Self {
        Self::ChatMessage {
            sender: "agent".to_string(),
            content: content.into(),
        }
    }

    /// Creates an error frame.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_frames() {
        let chat: ClientMessage =
            serde_json::from_str(r#"{"type":"chat_message","content":"list all tasks"}"#)
                .expect("chat");
        assert_eq!(
            chat,
            ClientMessage::ChatMessage {
                content: "list all tasks".to_string()
            }
        );

        let clear: ClientMessage =
            serde_json::from_str(r#"{"type":"clear_history"}"#).expect("clear");
        assert_eq!(clear, ClientMessage::ClearHistory);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn serializes_server_frames() {
        assert_eq!(
            serde_json::to_value(ServerMessage::agent("hi")).unwrap(),
            json!({"type": "chat_message", "sender": "agent", "content": "hi"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::TaskListUpdate { tasks: Vec::new() }).unwrap(),
            json!({"type": "task_list_update", "tasks": []})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::HistoryCleared).unwrap(),
            json!({"type": "history_cleared"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::error(GENERIC_ERROR)).unwrap(),
            json!({"type": "error", "message": GENERIC_ERROR})
        );
    }
}
