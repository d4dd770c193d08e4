//! Tool execution against a task store.
//!
//! Arguments are decoded leniently: every field is optional, unknown fields
//! are ignored and blank strings count as absent. Field values are validated
//! before required fields are checked, so a bad enum or date is reported even
//! when the call is also incomplete.

use crate::error::ToolError;
use crate::tool::{ToolKind, ToolRecord, ToolResult};
use serde::Deserialize;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use taskmate_tasks::{
    NewTask, Task, TaskChanges, TaskFilter, TaskId, TaskPriority, TaskSelector, TaskStatus,
    TaskStore, parse_due_date,
};
use tracing::{info, warn};

/// What happened when a tool call was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecution {
    /// The resolved tool, `None` if the name was not registered.
    pub kind: Option<ToolKind>,
    /// The outcome.
    pub result: ToolResult,
}

impl ToolExecution {
    /// Returns true if a mutating tool succeeded.
    #[must_use]
    pub fn mutated_records(&self) -> bool {
        self.kind.is_some_and(|kind| kind.is_mutating()) && self.result.is_success()
    }
}

/// Runs tool calls against a [`TaskStore`].
#[derive(Clone)]
pub struct ToolExecutor {
    store: Arc<dyn TaskStore>,
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor").finish_non_exhaustive()
    }
}

impl ToolExecutor {
    /// Creates an executor over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Executes the tool named `name`.
    ///
    /// Never fails: every fault is logged and returned as
    /// [`ToolResult::Failure`].
    pub async fn execute(&self, name: &str, arguments: &JsonValue) -> ToolExecution {
        let Some(kind) = ToolKind::from_name(name) else {
            let error = ToolError::UnknownTool {
                name: name.to_string(),
            };
            warn!(tool = name, "model requested an unknown tool");
            return ToolExecution {
                kind: None,
                result: ToolResult::failure(error.to_string()),
            };
        };

        let outcome = match kind {
            ToolKind::Create => self.create(arguments).await,
            ToolKind::Update => self.update(arguments).await,
            ToolKind::Delete => self.delete(arguments).await,
            ToolKind::List => self.list().await,
            ToolKind::Filter => self.filter(arguments).await,
        };

        let result = match outcome {
            Ok(result) => {
                info!(tool = name, "tool executed");
                result
            }
            Err(error) => {
                warn!(tool = name, %error, "tool call failed");
                ToolResult::failure(error.to_string())
            }
        };

        ToolExecution {
            kind: Some(kind),
            result,
        }
    }

    async fn create(&self, arguments: &JsonValue) -> Result<ToolResult, ToolError> {
        let args: CreateArgs = decode(ToolKind::Create, arguments)?;

        let priority = parse_opt::<TaskPriority>(args.priority.as_deref())?;
        let due_date = args
            .due_date
            .as_deref()
            .map(|value| parse_due_date("due_date", value))
            .transpose()?;
        let title = args
            .title
            .ok_or_else(|| ToolError::validation("A title is required to create a task."))?;

        let mut new_task = NewTask::new(title);
        if let Some(description) = args.description {
            new_task = new_task.with_description(description);
        }
        if let Some(due_date) = due_date {
            new_task = new_task.with_due_date(due_date);
        }
        if let Some(priority) = priority {
            new_task = new_task.with_priority(priority);
        }

        let task = self
            .store
            .create(new_task)
            .await
            .map_err(|e| ToolError::from_store("create", e))?;

        Ok(ToolResult::success(
            format!(
                "Task '{}' created successfully with ID {}.",
                task.title, task.id
            ),
            Some(ToolRecord::Task(task)),
        ))
    }

    async fn update(&self, arguments: &JsonValue) -> Result<ToolResult, ToolError> {
        let args: UpdateArgs = decode(ToolKind::Update, arguments)?;

        let changes = TaskChanges {
            status: parse_opt::<TaskStatus>(args.new_status.as_deref())?,
            priority: parse_opt::<TaskPriority>(args.new_priority.as_deref())?,
            due_date: args
                .new_due_date
                .as_deref()
                .map(|value| parse_due_date("new_due_date", value))
                .transpose()?,
            title: args.new_title,
            description: args.new_description,
        };
        let selector = selector(args.task_id, args.title_match)?;

        let task = self
            .store
            .update(&selector, changes)
            .await
            .map_err(|e| ToolError::from_store("update", e))?;

        Ok(ToolResult::success(
            format!("Task '{}' updated successfully.", task.title),
            Some(ToolRecord::Task(task)),
        ))
    }

    async fn delete(&self, arguments: &JsonValue) -> Result<ToolResult, ToolError> {
        let args: SelectorArgs = decode(ToolKind::Delete, arguments)?;
        let selector = selector(args.task_id, args.title_match)?;

        let task = self
            .store
            .delete(&selector)
            .await
            .map_err(|e| ToolError::from_store("delete", e))?;

        Ok(ToolResult::success(
            format!("Task '{}' (ID: {}) deleted successfully.", task.title, task.id),
            Some(ToolRecord::Task(task)),
        ))
    }

    async fn list(&self) -> Result<ToolResult, ToolError> {
        let tasks = self
            .store
            .list()
            .await
            .map_err(|e| ToolError::from_store("list", e))?;
        Ok(found(tasks))
    }

    async fn filter(&self, arguments: &JsonValue) -> Result<ToolResult, ToolError> {
        let args: FilterArgs = decode(ToolKind::Filter, arguments)?;

        let filter = TaskFilter {
            status: parse_opt::<TaskStatus>(args.status.as_deref())?,
            priority: parse_opt::<TaskPriority>(args.priority.as_deref())?,
            due_before: args
                .due_date_before
                .as_deref()
                .map(|value| parse_due_date("due_date_before", value))
                .transpose()?,
            due_after: args
                .due_date_after
                .as_deref()
                .map(|value| parse_due_date("due_date_after", value))
                .transpose()?,
        };

        let tasks = self
            .store
            .filter(&filter)
            .await
            .map_err(|e| ToolError::from_store("filter", e))?;
        Ok(found(tasks))
    }
}

fn found(tasks: Vec<Task>) -> ToolResult {
    ToolResult::success(
        format!("Found {} task(s).", tasks.len()),
        Some(ToolRecord::Tasks(tasks)),
    )
}

fn selector(
    task_id: Option<TaskId>,
    title_match: Option<String>,
) -> Result<TaskSelector, ToolError> {
    match (task_id, title_match) {
        (Some(id), _) => Ok(TaskSelector::Id(id)),
        (None, Some(title)) => Ok(TaskSelector::TitleMatch(title)),
        (None, None) => Err(ToolError::validation(
            "Either task_id or title_match must be provided.",
        )),
    }
}

fn parse_opt<T>(value: Option<&str>) -> Result<Option<T>, ToolError>
where
    T: std::str::FromStr,
    ToolError: From<T::Err>,
{
    value.map(str::parse::<T>).transpose().map_err(ToolError::from)
}

fn decode<T: DeserializeOwned + Default>(
    kind: ToolKind,
    arguments: &JsonValue,
) -> Result<T, ToolError> {
    match arguments {
        JsonValue::Null => Ok(T::default()),
        JsonValue::Object(_) => serde_json::from_value(arguments.clone())
            .map_err(|e| ToolError::validation(format!("Invalid arguments for {kind}: {e}"))),
        _ => Err(ToolError::validation(format!(
            "Arguments for {kind} must be an object."
        ))),
    }
}

fn non_blank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Accepts an integer, an integral float, or a numeric string.
fn lenient_task_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<TaskId>, D::Error> {
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as TaskId)
            })
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("task_id must be an integer, got {n}"))),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("task_id must be an integer, got '{s}'"))),
        Some(other) => Err(de::Error::custom(format!(
            "task_id must be an integer, got {other}"
        ))),
    }
}

#[derive(Debug, Default, Deserialize)]
struct CreateArgs {
    #[serde(default, deserialize_with = "non_blank")]
    title: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    description: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    due_date: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    priority: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UpdateArgs {
    #[serde(default, deserialize_with = "lenient_task_id")]
    task_id: Option<TaskId>,
    #[serde(default, deserialize_with = "non_blank")]
    title_match: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    new_title: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    new_description: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    new_status: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    new_due_date: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    new_priority: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SelectorArgs {
    #[serde(default, deserialize_with = "lenient_task_id")]
    task_id: Option<TaskId>,
    #[serde(default, deserialize_with = "non_blank")]
    title_match: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterArgs {
    #[serde(default, deserialize_with = "non_blank")]
    status: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    priority: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    due_date_before: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    due_date_after: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStore;
    use chrono::NaiveDate;
    use serde_json::json;
    use taskmate_tasks::InMemoryTaskStore;

    fn executor() -> (ToolExecutor, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        (ToolExecutor::new(store.clone()), store)
    }

    fn created_task(execution: &ToolExecution) -> &Task {
        match execution.result.record() {
            Some(ToolRecord::Task(task)) => task,
            other => panic!("expected a task record, got {other:?}"),
        }
    }

    fn listed_tasks(execution: &ToolExecution) -> &[Task] {
        match execution.result.record() {
            Some(ToolRecord::Tasks(tasks)) => tasks.as_slice(),
            other => panic!("expected a task list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_tools_fail_without_touching_the_store() {
        let (executor, store) = executor();

        for name in ["send_email", "", "CREATE_TASK", "create_task "] {
            let execution = executor.execute(name, &json!({"title": "x"})).await;
            assert_eq!(execution.kind, None);
            assert!(!execution.result.is_success());
            assert!(execution.result.message().contains("Unknown tool"));
            assert!(!execution.mutated_records());
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_with_title_only_uses_defaults() {
        let (executor, _) = executor();

        let execution = executor
            .execute("create_task", &json!({"title": "buy milk"}))
            .await;

        let task = created_task(&execution);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.due_date, None);
        assert_eq!(
            execution.result.message(),
            "Task 'buy milk' created successfully with ID 1."
        );
        assert!(execution.mutated_records());
    }

    #[tokio::test]
    async fn create_records_every_given_field() {
        let (executor, _) = executor();

        let execution = executor
            .execute(
                "create_task",
                &json!({
                    "title": "file taxes",
                    "description": "federal and state",
                    "priority": "urgent",
                    "due_date": "2025-04-15"
                }),
            )
            .await;

        let task = created_task(&execution);
        assert_eq!(task.description.as_deref(), Some("federal and state"));
        assert_eq!(task.priority, TaskPriority::Urgent);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 4, 15));
    }

    #[tokio::test]
    async fn create_then_filter_finds_task_once() {
        let (executor, _) = executor();
        executor
            .execute("create_task", &json!({"title": "other", "priority": "low"}))
            .await;
        let created = executor
            .execute(
                "create_task",
                &json!({"title": "ship release", "priority": "HIGH", "due_date": "2025-08-02"}),
            )
            .await;
        let id = created_task(&created).id;

        let filtered = executor
            .execute("filter_tasks", &json!({"status": "todo", "priority": "high"}))
            .await;

        let ids: Vec<_> = listed_tasks(&filtered).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![id]);
        assert!(!filtered.mutated_records());
    }

    #[tokio::test]
    async fn priority_typo_is_reported_before_missing_title() {
        let (executor, store) = executor();

        let execution = executor
            .execute("create_task", &json!({"priority": "urgentt"}))
            .await;

        assert_eq!(
            execution.result,
            ToolResult::failure(
                "Invalid priority: urgentt. Must be one of low, medium, high, urgent."
            )
        );
        assert!(!execution.mutated_records());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_requires_title() {
        let (executor, _) = executor();
        let execution = executor
            .execute("create_task", &json!({"title": "  "}))
            .await;
        assert_eq!(
            execution.result.message(),
            "A title is required to create a task."
        );
    }

    #[tokio::test]
    async fn malformed_dates_are_rejected() {
        let (executor, _) = executor();

        let execution = executor
            .execute("create_task", &json!({"title": "x", "due_date": "tomorrow"}))
            .await;
        assert_eq!(
            execution.result.message(),
            "Invalid due_date format. Use YYYY-MM-DD."
        );

        let execution = executor
            .execute("filter_tasks", &json!({"due_date_after": "2025/08/01"}))
            .await;
        assert_eq!(
            execution.result.message(),
            "Invalid due_date_after format. Use YYYY-MM-DD."
        );
    }

    #[tokio::test]
    async fn update_missing_task_reports_not_found() {
        let (executor, _) = executor();

        let execution = executor
            .execute("update_task", &json!({"task_id": 999, "new_status": "done"}))
            .await;

        assert_eq!(
            execution.result,
            ToolResult::failure("Task not found with ID 999.")
        );
        assert!(!execution.mutated_records());
    }

    #[tokio::test]
    async fn update_by_title_match_applies_changes() {
        let (executor, _) = executor();
        executor
            .execute("create_task", &json!({"title": "Call Mom"}))
            .await;

        let execution = executor
            .execute(
                "update_task",
                &json!({
                    "title_match": "mom",
                    "new_status": "In_Progress",
                    "new_due_date": "2025-09-01"
                }),
            )
            .await;

        let task = created_task(&execution);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 9, 1));
        assert_eq!(
            execution.result.message(),
            "Task 'Call Mom' updated successfully."
        );
        assert!(execution.mutated_records());
    }

    #[tokio::test]
    async fn task_id_accepts_numeric_strings_and_integral_floats() {
        let (executor, store) = executor();
        executor.execute("create_task", &json!({"title": "a"})).await;
        executor.execute("create_task", &json!({"title": "b"})).await;

        let by_string = executor
            .execute("delete_task", &json!({"task_id": "1"}))
            .await;
        assert_eq!(
            by_string.result.message(),
            "Task 'a' (ID: 1) deleted successfully."
        );

        let by_float = executor
            .execute("delete_task", &json!({"task_id": 2.0}))
            .await;
        assert!(by_float.result.is_success());
        assert!(store.is_empty().await);

        let fractional = executor
            .execute("delete_task", &json!({"task_id": 2.5}))
            .await;
        assert!(fractional.result.message().contains("task_id must be an integer"));
    }

    #[tokio::test]
    async fn selector_is_required() {
        let (executor, _) = executor();
        for tool in ["update_task", "delete_task"] {
            let execution = executor.execute(tool, &json!({"new_title": "x"})).await;
            assert_eq!(
                execution.result.message(),
                "Either task_id or title_match must be provided."
            );
        }
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let (executor, _) = executor();
        let execution = executor.execute("create_task", &json!(["buy milk"])).await;
        assert_eq!(
            execution.result.message(),
            "Arguments for create_task must be an object."
        );
    }

    #[tokio::test]
    async fn list_on_empty_store() {
        let (executor, _) = executor();

        let execution = executor.execute("list_tasks", &JsonValue::Null).await;

        assert_eq!(execution.result.message(), "Found 0 task(s).");
        assert!(listed_tasks(&execution).is_empty());
        assert_eq!(execution.result.to_json()["tasks"], json!([]));
    }

    #[tokio::test]
    async fn store_failures_become_failure_results() {
        let executor = ToolExecutor::new(Arc::new(FailingStore));

        let execution = executor
            .execute("create_task", &json!({"title": "x"}))
            .await;

        assert_eq!(
            execution.result,
            ToolResult::failure("Failed to create task: database is down")
        );
        assert!(!execution.mutated_records());
    }
}
