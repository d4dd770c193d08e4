//! Error types for the conversation crate.
//!
//! - `ToolError`: a tool call could not be carried out. Never leaves the
//!   executor; it becomes a `ToolResult::Failure` fed back to the model.
//! - `TurnError`: a turn could not reach its outcome. Propagated to the
//!   session caller inside a rootcause `Report`.

use crate::tool::ToolKind;
use std::fmt;
use taskmate_ai::LlmError;
use taskmate_tasks::{ParseTaskFieldError, TaskSelector, TaskStoreError};

/// Errors from tool execution.
///
/// The `Display` output is what the model sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Arguments are missing, malformed, or out of range.
    Validation { message: String },
    /// The selector resolved to no task.
    NotFound { selector: TaskSelector },
    /// The task store failed.
    Store { verb: &'static str, reason: String },
    /// The model asked for a tool that is not registered.
    UnknownTool { name: String },
}

impl ToolError {
    /// Creates a validation error with a user-facing message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Classifies a store error raised while trying to `verb` a task.
    #[must_use]
    pub fn from_store(verb: &'static str, error: TaskStoreError) -> Self {
        match error {
            TaskStoreError::NotFound { selector } => Self::NotFound { selector },
            TaskStoreError::Backend { reason } => Self::Store { verb, reason },
        }
    }
}

impl From<ParseTaskFieldError> for ToolError {
    fn from(error: ParseTaskFieldError) -> Self {
        Self::validation(error.to_string())
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { message } => f.write_str(message),
            Self::NotFound { selector } => write!(
                f,
                "{}",
                TaskStoreError::NotFound {
                    selector: selector.clone()
                }
            ),
            Self::Store { verb, reason } => write!(f, "Failed to {verb} task: {reason}"),
            Self::UnknownTool { name } => {
                let available: Vec<&str> = ToolKind::ALL.iter().map(ToolKind::name).collect();
                write!(
                    f,
                    "Unknown tool '{name}'. Available tools: {}",
                    available.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Errors that end a turn without an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The model could not be reached or its reply could not be understood.
    ModelInvocation(LlmError),
    /// The stored history ends in tool calls that never got results.
    UnresolvedToolCalls { call_ids: Vec<String> },
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelInvocation(e) => write!(f, "model invocation failed: {e}"),
            Self::UnresolvedToolCalls { call_ids } => write!(
                f,
                "history ends with unresolved tool calls: {}",
                call_ids.join(", ")
            ),
        }
    }
}

impl std::error::Error for TurnError {}

impl From<LlmError> for TurnError {
    fn from(e: LlmError) -> Self {
        Self::ModelInvocation(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_lists_registered_names() {
        let err = ToolError::UnknownTool {
            name: "send_email".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown tool 'send_email'. Available tools: create_task, update_task, delete_task, list_tasks, filter_tasks"
        );
    }

    #[test]
    fn store_errors_are_classified() {
        let not_found = ToolError::from_store(
            "update",
            TaskStoreError::NotFound {
                selector: TaskSelector::Id(999),
            },
        );
        assert_eq!(not_found.to_string(), "Task not found with ID 999.");

        let backend = ToolError::from_store(
            "delete",
            TaskStoreError::Backend {
                reason: "connection reset".to_string(),
            },
        );
        assert_eq!(backend.to_string(), "Failed to delete task: connection reset");
    }

    #[test]
    fn turn_error_display() {
        let err = TurnError::from(LlmError::Timeout);
        assert!(err.to_string().contains("timed out"));

        let err = TurnError::UnresolvedToolCalls {
            call_ids: vec!["call_1".to_string()],
        };
        assert!(err.to_string().contains("call_1"));
    }
}
