//! Conversation session management.
//!
//! A session owns the stored history of one conversation. Turns run on a
//! copy; the stored history is replaced only when a turn completes.

use crate::agent::{Agent, TurnSummary};
use crate::error::TurnError;
use crate::message::Message;
use crate::state::TurnOutcome;
use crate::tool::{ToolRecord, ToolResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taskmate_core::ConversationSessionId;
use tracing::{info, instrument};

/// A conversation session.
#[derive(Debug)]
pub struct Session {
    id: ConversationSessionId,
    agent: Arc<Agent>,
    history: Vec<Message>,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session with empty history.
    #[must_use]
    pub fn new(agent: Arc<Agent>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationSessionId::new(),
            agent,
            history: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> ConversationSessionId {
        self.id
    }

    /// Returns the stored history.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Returns the number of stored messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When a turn last completed or the history was cleared.
    #[must_use]
    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    /// Runs one turn for `text`.
    ///
    /// # Errors
    ///
    /// Returns the turn error unchanged; the stored history is left as it was
    /// before the call.
    #[instrument(skip(self, text), fields(session_id = %self.id))]
    pub async fn submit(&mut self, text: &str) -> taskmate_core::Result<TurnSummary, TurnError> {
        let (history, summary) = self.agent.run_turn(self.history.clone(), text).await?;

        self.history = history;
        self.last_active_at = Utc::now();
        info!(
            messages = self.history.len(),
            records_mutated = summary.records_mutated,
            "turn complete"
        );
        Ok(summary)
    }

    /// Forgets the conversation. Tasks are not affected.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.last_active_at = Utc::now();
        info!(session_id = %self.id, "history cleared");
    }

    /// Flattens an outcome into text for the user.
    #[must_use]
    pub fn render_final_text(outcome: &TurnOutcome) -> String {
        match outcome {
            TurnOutcome::Text(text) => text.clone(),
            TurnOutcome::ToolResults(outcomes) => {
                let mut lines = Vec::new();
                for outcome in outcomes {
                    lines.push(format!(
                        "Tool '{}' executed: {}",
                        outcome.tool_name,
                        outcome.result.message()
                    ));
                    if let ToolResult::Success {
                        record: Some(record),
                        ..
                    } = &outcome.result
                    {
                        lines.push(match record {
                            ToolRecord::Task(task) => format!(
                                "Task details: Title: {}, Status: {}, Priority: {}, ID: {}",
                                task.title, task.status, task.priority, task.id
                            ),
                            ToolRecord::Tasks(tasks) => {
                                format!("{} task(s) returned.", tasks.len())
                            }
                        });
                    }
                }
                lines.join("\n")
            }
        }
    }
}
