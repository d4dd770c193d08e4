//! Test doubles shared by the module tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use taskmate_ai::{LlmBackend, LlmError, LlmProvider, LlmRequest, LlmResponse};
use taskmate_tasks::{
    NewTask, Task, TaskChanges, TaskFilter, TaskSelector, TaskStore, TaskStoreError,
};

/// Replays canned responses and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: impl IntoIterator<Item = Result<LlmResponse, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(LlmResponse::text("script exhausted")))
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Gemini
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// A store whose every call fails with a backend error.
pub struct FailingStore;

fn down() -> TaskStoreError {
    TaskStoreError::Backend {
        reason: "database is down".to_string(),
    }
}

#[async_trait]
impl TaskStore for FailingStore {
    async fn create(&self, _task: NewTask) -> Result<Task, TaskStoreError> {
        Err(down())
    }

    async fn update(
        &self,
        _selector: &TaskSelector,
        _changes: TaskChanges,
    ) -> Result<Task, TaskStoreError> {
        Err(down())
    }

    async fn delete(&self, _selector: &TaskSelector) -> Result<Task, TaskStoreError> {
        Err(down())
    }

    async fn list(&self) -> Result<Vec<Task>, TaskStoreError> {
        Err(down())
    }

    async fn filter(&self, _filter: &TaskFilter) -> Result<Vec<Task>, TaskStoreError> {
        Err(down())
    }
}
