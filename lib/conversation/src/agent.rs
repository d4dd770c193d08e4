//! The model/tool loop that drives one turn.
//!
//! A turn is a small state machine:
//!
//! 1. **Model**: send the history and tool schemas to the model. Text ends
//!    the turn; tool calls are recorded and queued.
//! 2. **Tool**: run the queued calls in model order, append one result per
//!    call, then go back to **Model**. After `max_tool_rounds` batches the
//!    turn ends with the last batch's results instead.
//! 3. **Terminal**: the outcome is handed to the caller.
//!
//! The [`ConversationState`] is moved through every transition; nothing
//! outside the loop sees it until the turn completes.

use crate::error::TurnError;
use crate::executor::ToolExecutor;
use crate::message::Message;
use crate::state::{ConversationState, ToolOutcome, TurnOutcome};
use crate::tool::ToolRegistry;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use taskmate_ai::{LlmBackend, LlmRequest};
use tracing::{debug, info, warn};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a task management assistant. \
Use the provided tools to create, update, delete, list and filter tasks. \
Resolve relative dates yourself and pass every date as YYYY-MM-DD. \
Valid statuses are todo, in_progress, done and cancelled. \
Valid priorities are low, medium, high and urgent. \
After using tools, tell the user briefly what happened.";

/// Loop configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentConfig {
    /// Tool batches allowed per turn before the loop stops calling the model.
    /// Never below 1.
    #[serde(
        default = "default_max_tool_rounds",
        deserialize_with = "at_least_one_round"
    )]
    pub max_tool_rounds: usize,
    /// System prompt sent with every model call.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: Option<String>,
    /// Sampling temperature, if the backend default should be overridden.
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_max_tool_rounds() -> usize {
    8
}

fn at_least_one_round<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(usize::deserialize(deserializer)?.max(1))
}

#[allow(clippy::unnecessary_wraps)]
fn default_system_prompt() -> Option<String> {
    Some(DEFAULT_SYSTEM_PROMPT.to_string())
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            system_prompt: default_system_prompt(),
            temperature: None,
        }
    }
}

impl AgentConfig {
    /// Sets the round cap. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    /// Sets or removes the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }
}

/// Where the loop is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPhase {
    /// The model is to be invoked.
    Model,
    /// Queued tool calls are to be executed.
    Tool,
    /// The turn is over.
    Terminal(TurnOutcome),
}

/// What a completed turn reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    /// How the turn ended.
    pub outcome: TurnOutcome,
    /// True if a create, update or delete succeeded during the turn.
    pub records_mutated: bool,
}

/// Runs turns against a model and a tool executor.
pub struct Agent {
    backend: Arc<dyn LlmBackend>,
    executor: ToolExecutor,
    config: AgentConfig,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.backend.model())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Creates an agent.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, executor: ToolExecutor, config: AgentConfig) -> Self {
        Self {
            backend,
            executor,
            config,
        }
    }

    /// Runs one turn over `history` for the user utterance `text`.
    ///
    /// Returns the final history together with the turn summary.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedToolCalls` if `history` ends in tool calls without
    /// results, and `ModelInvocation` if the model cannot be reached or
    /// understood. Neither error leaves partial state behind.
    pub async fn run_turn(
        &self,
        history: Vec<Message>,
        text: &str,
    ) -> taskmate_core::Result<(Vec<Message>, TurnSummary), TurnError> {
        let mut state = ConversationState::from_history(history);

        let unresolved: Vec<String> = state
            .unresolved_tool_calls()
            .into_iter()
            .map(|call| call.id.clone())
            .collect();
        if !unresolved.is_empty() {
            return Err(TurnError::UnresolvedToolCalls { call_ids: unresolved }.into());
        }

        state.begin_turn();
        if !state.push_user(text) {
            debug!("duplicate user message not appended");
        }

        let mut phase = TurnPhase::Model;
        let mut rounds = 0;
        loop {
            (phase, state) = match phase {
                TurnPhase::Model => self.invoke_model(state).await?,
                TurnPhase::Tool => {
                    rounds += 1;
                    self.run_tools(state, rounds).await
                }
                TurnPhase::Terminal(outcome) => {
                    let summary = TurnSummary {
                        outcome,
                        records_mutated: state.records_mutated(),
                    };
                    return Ok((state.into_messages(), summary));
                }
            };
        }
    }

    async fn invoke_model(
        &self,
        mut state: ConversationState,
    ) -> taskmate_core::Result<(TurnPhase, ConversationState), TurnError> {
        let mut request =
            LlmRequest::new(state.llm_messages()).with_tools(ToolRegistry::global().schemas());
        if let Some(system) = &self.config.system_prompt {
            request = request.with_system(system.clone());
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        debug!(messages = request.messages.len(), "invoking model");
        let response = self
            .backend
            .generate(&request)
            .await
            .map_err(TurnError::ModelInvocation)?;

        if response.requests_tools() {
            info!(calls = response.tool_calls.len(), "model requested tools");
            state.push_model_tool_calls(response.content, response.tool_calls);
            Ok((TurnPhase::Tool, state))
        } else {
            debug!("model answered directly");
            let text = response.content;
            state.push_model_text(text.clone());
            Ok((TurnPhase::Terminal(TurnOutcome::Text(text)), state))
        }
    }

    async fn run_tools(
        &self,
        mut state: ConversationState,
        round: usize,
    ) -> (TurnPhase, ConversationState) {
        let calls = state.take_pending();
        let mut outcomes = Vec::with_capacity(calls.len());

        for call in &calls {
            let execution = self.executor.execute(&call.name, &call.arguments).await;
            state.push_tool_result(call, &execution.result);
            if execution.mutated_records() {
                state.mark_records_mutated();
            }
            outcomes.push(ToolOutcome {
                tool_name: call.name.clone(),
                result: execution.result,
            });
        }

        if round >= self.config.max_tool_rounds {
            warn!(
                rounds = round,
                "tool round limit reached, ending turn without a model answer"
            );
            return (TurnPhase::Terminal(TurnOutcome::ToolResults(outcomes)), state);
        }
        (TurnPhase::Model, state)
    }
}
