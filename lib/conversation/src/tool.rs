//! Tool registry for conversation mode.
//!
//! The tool set is closed: every tool is a [`ToolKind`] variant, and the
//! registry is a process-wide table built once on first use.

use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::sync::LazyLock;
use taskmate_ai::ToolSchema;
use taskmate_tasks::Task;

/// The tools the model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Create a task.
    Create,
    /// Update a task selected by id or title.
    Update,
    /// Delete a task selected by id or title.
    Delete,
    /// List every task.
    List,
    /// List tasks matching criteria.
    Filter,
}

impl ToolKind {
    /// Every tool, in registry order.
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::List,
        Self::Filter,
    ];

    /// Resolves a wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Returns the wire name the model uses.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Create => "create_task",
            Self::Update => "update_task",
            Self::Delete => "delete_task",
            Self::List => "list_tasks",
            Self::Filter => "filter_tasks",
        }
    }

    /// Returns true for tools that write to the task store.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Definition of a tool available during conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// The tool.
    pub kind: ToolKind,
    /// Human-readable description for the model.
    pub description: &'static str,
    /// JSON schema for the arguments object.
    pub parameters: JsonValue,
}

impl ToolDefinition {
    /// Returns the wire name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Converts to the model-facing schema.
    #[must_use]
    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description.to_string(),
            parameters: self.parameters.clone(),
        }
    }
}

fn definition(kind: ToolKind) -> ToolDefinition {
    let status = json!({
        "type": "string",
        "enum": ["todo", "in_progress", "done", "cancelled"]
    });
    let priority = json!({
        "type": "string",
        "enum": ["low", "medium", "high", "urgent"]
    });
    let date = |description: &str| json!({ "type": "string", "description": description });
    let selector = json!({
        "task_id": { "type": "integer", "description": "ID of the task." },
        "title_match": {
            "type": "string",
            "description": "Case-insensitive part of the task title, used when the ID is unknown."
        }
    });

    match kind {
        ToolKind::Create => ToolDefinition {
            kind,
            description: "Create a new task. Resolve relative dates before calling.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "Short title of the task." },
                    "description": { "type": "string" },
                    "due_date": date("Due date as YYYY-MM-DD."),
                    "priority": priority,
                },
                "required": ["title"]
            }),
        },
        ToolKind::Update => {
            let mut properties = selector;
            properties["new_title"] = json!({ "type": "string" });
            properties["new_description"] = json!({ "type": "string" });
            properties["new_status"] = status;
            properties["new_due_date"] = date("New due date as YYYY-MM-DD.");
            properties["new_priority"] = priority;
            ToolDefinition {
                kind,
                description: "Update an existing task identified by task_id or title_match.",
                parameters: json!({ "type": "object", "properties": properties }),
            }
        }
        ToolKind::Delete => ToolDefinition {
            kind,
            description: "Delete a task identified by task_id or title_match.",
            parameters: json!({ "type": "object", "properties": selector }),
        },
        ToolKind::List => ToolDefinition {
            kind,
            description: "List all tasks, newest first.",
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolKind::Filter => ToolDefinition {
            kind,
            description: "List tasks matching every given criterion. Date bounds are inclusive.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "status": status,
                    "priority": priority,
                    "due_date_before": date("Latest due date as YYYY-MM-DD."),
                    "due_date_after": date("Earliest due date as YYYY-MM-DD."),
                }
            }),
        },
    }
}

static REGISTRY: LazyLock<ToolRegistry> = LazyLock::new(|| ToolRegistry {
    definitions: ToolKind::ALL.into_iter().map(definition).collect(),
});

/// Registry of available tools.
#[derive(Debug)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    /// Gets a tool definition by wire name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name() == name)
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns all definitions in registry order.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Converts definitions to the format advertised to the model.
    #[must_use]
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.definitions.iter().map(ToolDefinition::to_schema).collect()
    }
}

/// The record a successful tool call produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRecord {
    /// Created, updated or deleted task.
    Task(Task),
    /// Listed or filtered tasks.
    Tasks(Vec<Task>),
}

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// The tool ran.
    Success {
        message: String,
        record: Option<ToolRecord>,
    },
    /// The tool could not run.
    Failure { message: String },
}

impl ToolResult {
    /// Creates a success result.
    #[must_use]
    pub fn success(message: impl Into<String>, record: Option<ToolRecord>) -> Self {
        Self::Success {
            message: message.into(),
            record,
        }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Returns true for `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Failure { message } => message,
        }
    }

    /// Returns the record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&ToolRecord> {
        match self {
            Self::Success { record, .. } => record.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the object sent back to the model.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Success { message, record } => {
                let mut value = json!({ "status": "success", "message": message });
                match record {
                    Some(ToolRecord::Task(task)) => value["task"] = json!(task),
                    Some(ToolRecord::Tasks(tasks)) => value["tasks"] = json!(tasks),
                    None => {}
                }
                value
            }
            Self::Failure { message } => json!({ "status": "error", "message": message }),
        }
    }

    /// Returns [`Self::to_json`] as a string for the history.
    #[must_use]
    pub fn to_content(&self) -> String {
        self.to_json().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taskmate_tasks::{TaskPriority, TaskStatus};

    #[test]
    fn names_round_trip_through_from_name() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("drop_database"), None);
    }

    #[test]
    fn only_writes_are_mutating() {
        let mutating: Vec<_> = ToolKind::ALL
            .into_iter()
            .filter(ToolKind::is_mutating)
            .collect();
        assert_eq!(
            mutating,
            vec![ToolKind::Create, ToolKind::Update, ToolKind::Delete]
        );
    }

    #[test]
    fn registry_exposes_every_tool_in_order() {
        let registry = ToolRegistry::global();
        let names: Vec<_> = registry.schemas().into_iter().map(|s| s.name).collect();

        assert_eq!(
            names,
            vec![
                "create_task",
                "update_task",
                "delete_task",
                "list_tasks",
                "filter_tasks"
            ]
        );
        assert!(registry.contains("filter_tasks"));
        assert!(!registry.contains("send_email"));
    }

    #[test]
    fn create_schema_requires_title() {
        let create = ToolRegistry::global().get("create_task").expect("registered");
        assert_eq!(create.parameters["required"], json!(["title"]));
        assert_eq!(
            create.parameters["properties"]["priority"]["enum"],
            json!(["low", "medium", "high", "urgent"])
        );
    }

    #[test]
    fn update_schema_has_selector_and_changes() {
        let update = ToolRegistry::global().get("update_task").expect("registered");
        let properties = &update.parameters["properties"];
        assert!(properties.get("task_id").is_some());
        assert!(properties.get("title_match").is_some());
        assert!(properties.get("new_status").is_some());
        assert!(update.parameters.get("required").is_none());
    }

    #[test]
    fn result_json_carries_records() {
        let now = Utc::now();
        let task = Task {
            id: 1,
            title: "buy milk".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            created_at: now,
            updated_at: now,
        };

        let created = ToolResult::success("created", Some(ToolRecord::Task(task)));
        assert_eq!(created.to_json()["status"], "success");
        assert_eq!(created.to_json()["task"]["title"], "buy milk");

        let listed = ToolResult::success("Found 0 task(s).", Some(ToolRecord::Tasks(Vec::new())));
        assert_eq!(listed.to_json()["tasks"], json!([]));

        let failed = ToolResult::failure("nope");
        let content: JsonValue = serde_json::from_str(&failed.to_content()).expect("json");
        assert_eq!(content, json!({ "status": "error", "message": "nope" }));
        assert!(failed.record().is_none());
    }
}
