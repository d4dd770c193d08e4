//! Conversation state carried through one turn.

use crate::message::{Message, ToolCall};
use crate::tool::ToolResult;
use std::collections::HashSet;
use taskmate_ai::LlmMessage;

/// One executed tool call, as reported in a structured outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Name the model used.
    pub tool_name: String,
    /// What the executor returned.
    pub result: ToolResult,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered in text.
    Text(String),
    /// The turn stopped after a tool batch without a model answer.
    ToolResults(Vec<ToolOutcome>),
}

/// History and bookkeeping for the turn in flight.
///
/// Owned by the loop for the whole turn and moved through each transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    messages: Vec<Message>,
    pending: Vec<ToolCall>,
    records_mutated: bool,
}

impl ConversationState {
    /// Starts a turn from stored history.
    #[must_use]
    pub fn from_history(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Returns the history.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consumes the state, returning the history.
    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Returns the tool calls awaiting execution.
    #[must_use]
    pub fn pending(&self) -> &[ToolCall] {
        &self.pending
    }

    /// Returns true once a mutating tool has succeeded this turn.
    #[must_use]
    pub fn records_mutated(&self) -> bool {
        self.records_mutated
    }

    /// Returns calls from the latest model message that have no result yet.
    #[must_use]
    pub fn unresolved_tool_calls(&self) -> Vec<&ToolCall> {
        let Some(index) = self
            .messages
            .iter()
            .rposition(|m| matches!(m, Message::Model { .. }))
        else {
            return Vec::new();
        };

        let answered: HashSet<&str> = self.messages[index + 1..]
            .iter()
            .filter_map(|m| match m {
                Message::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();

        self.messages[index]
            .tool_calls()
            .iter()
            .filter(|call| !answered.contains(call.id.as_str()))
            .collect()
    }

    /// Appends the user utterance unless it is already the last message.
    ///
    /// Returns true if the message was appended.
    pub fn push_user(&mut self, text: &str) -> bool {
        if self.messages.last().is_some_and(|m| m.is_user_text(text)) {
            return false;
        }
        self.messages.push(Message::user(text));
        true
    }

    /// Resets per-turn bookkeeping. History is kept.
    pub fn begin_turn(&mut self) {
        self.pending.clear();
        self.records_mutated = false;
    }

    /// Records a text answer.
    pub fn push_model_text(&mut self, text: impl Into<String>) {
        self.messages.push(Message::model(text));
        self.pending.clear();
    }

    /// Records a model message requesting tools and queues the calls.
    pub fn push_model_tool_calls(&mut self, text: String, tool_calls: Vec<ToolCall>) {
        self.messages.push(Message::Model {
            text,
            tool_calls: tool_calls.clone(),
        });
        self.pending = tool_calls;
    }

    /// Removes and returns the queued calls.
    pub fn take_pending(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.pending)
    }

    /// Appends the result for `call`.
    pub fn push_tool_result(&mut self, call: &ToolCall, result: &ToolResult) {
        self.messages
            .push(Message::tool_result(call, result.to_content()));
    }

    /// Raises the records mutated flag for this turn.
    pub fn mark_records_mutated(&mut self) {
        self.records_mutated = true;
    }

    /// Converts the history for the model.
    #[must_use]
    pub fn llm_messages(&self) -> Vec<LlmMessage> {
        self.messages.iter().map(LlmMessage::from).collect()
    }
}
