//! Conversation service for taskmate.
//!
//! This crate provides:
//!
//! - **Tool Registry**: the closed set of task tools advertised to the model
//! - **Tool Executor**: validates tool arguments and runs them against a `TaskStore`
//! - **Conversation State**: message history and pending tool calls for one turn
//! - **Agent**: the model/tool loop that drives a turn to its outcome
//! - **Session**: per-conversation history with submit and clear operations

pub mod agent;
pub mod error;
pub mod executor;
pub mod message;
pub mod session;
pub mod state;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{Agent, AgentConfig, TurnPhase, TurnSummary};
pub use error::{ToolError, TurnError};
pub use executor::{ToolExecution, ToolExecutor};
pub use message::{Message, ToolCall};
pub use session::Session;
pub use state::{ConversationState, ToolOutcome, TurnOutcome};
pub use tool::{ToolDefinition, ToolKind, ToolRecord, ToolRegistry, ToolResult};
