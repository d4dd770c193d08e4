//! Error types for the tasks crate.
//!
//! - `ParseTaskFieldError`: a textual field value could not be parsed
//! - `TaskStoreError`: a store operation failed

use crate::store::TaskSelector;
use crate::task::{TaskPriority, TaskStatus};
use std::fmt;

/// Errors from parsing task field values supplied as text.
///
/// The `Display` output is user-facing: it is relayed verbatim to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTaskFieldError {
    /// Status is not one of the known values.
    InvalidStatus { value: String },
    /// Priority is not one of the known values.
    InvalidPriority { value: String },
    /// A date field is not `YYYY-MM-DD`.
    InvalidDate { field: &'static str, value: String },
}

fn join_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().collect::<Vec<_>>().join(", ")
}

impl fmt::Display for ParseTaskFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStatus { value } => write!(
                f,
                "Invalid status: {value}. Must be one of {}.",
                join_names(TaskStatus::ALL.iter().map(TaskStatus::as_str))
            ),
            Self::InvalidPriority { value } => write!(
                f,
                "Invalid priority: {value}. Must be one of {}.",
                join_names(TaskPriority::ALL.iter().map(TaskPriority::as_str))
            ),
            Self::InvalidDate { field, .. } => {
                write!(f, "Invalid {field} format. Use YYYY-MM-DD.")
            }
        }
    }
}

impl std::error::Error for ParseTaskFieldError {}

/// Errors from task store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStoreError {
    /// The selector matched no task.
    NotFound { selector: TaskSelector },
    /// The underlying storage failed (connection, constraint violation, ...).
    Backend { reason: String },
}

impl fmt::Display for TaskStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { selector } => match selector {
                TaskSelector::Id(id) => write!(f, "Task not found with ID {id}."),
                TaskSelector::TitleMatch(title) => {
                    write!(f, "Task not found matching '{title}'.")
                }
            },
            Self::Backend { reason } => write!(f, "task store failure: {reason}"),
        }
    }
}

impl std::error::Error for TaskStoreError {}
