//! The task store seam.
//!
//! The conversation layer only talks to storage through [`TaskStore`].
//! Implementations must make every mutating call atomic: the field changes
//! and the `updated_at` bump persist together or not at all.

use crate::error::TaskStoreError;
use crate::task::{Task, TaskId, TaskPriority, TaskStatus};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an existing task for update or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSelector {
    /// Exact id.
    Id(TaskId),
    /// Case-insensitive substring of the title. The lowest id wins.
    TitleMatch(String),
}

impl TaskSelector {
    /// Returns true if `task` is selected.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::Id(id) => task.id == *id,
            Self::TitleMatch(needle) => task
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

impl fmt::Display for TaskSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::TitleMatch(title) => write!(f, "title matching '{title}'"),
        }
    }
}

/// Fields for a new task. Status always starts as `todo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
}

impl NewTask {
    /// Creates a new task with medium priority and no due date.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            priority: TaskPriority::default(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the due date.
    #[must_use]
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// A partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,
}

impl TaskChanges {
    /// Applies the changes to `task` in place. Does not touch timestamps.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
    }

    /// Returns true if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Criteria for [`TaskStore::filter`]. All set criteria must hold.
///
/// Date bounds are inclusive; a task without a due date never satisfies a
/// date bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_before: Option<NaiveDate>,
    pub due_after: Option<NaiveDate>,
}

impl TaskFilter {
    /// Returns true if `task` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }
        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }
        if let Some(before) = self.due_before
            && !task.due_date.is_some_and(|due| due <= before)
        {
            return false;
        }
        if let Some(after) = self.due_after
            && !task.due_date.is_some_and(|due| due >= after)
        {
            return false;
        }
        true
    }
}

/// Persistent storage for tasks.
///
/// `list` and `filter` return tasks newest first (`created_at` descending).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Creates a task with status `todo`.
    async fn create(&self, task: NewTask) -> Result<Task, TaskStoreError>;

    /// Applies `changes` to the selected task and bumps `updated_at`.
    async fn update(
        &self,
        selector: &TaskSelector,
        changes: TaskChanges,
    ) -> Result<Task, TaskStoreError>;

    /// Deletes the selected task and returns it as it was.
    async fn delete(&self, selector: &TaskSelector) -> Result<Task, TaskStoreError>;

    /// Returns all tasks.
    async fn list(&self) -> Result<Vec<Task>, TaskStoreError>;

    /// Returns the tasks matching `filter`.
    async fn filter(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskStoreError>;
}
