//! Task records for taskmate.
//!
//! This crate provides:
//!
//! - **Task model**: `Task`, `TaskStatus`, `TaskPriority`
//! - **Store seam**: the `TaskStore` trait with selectors, change sets and filters
//! - **In-memory store**: a mutex-guarded `TaskStore` for tests and local runs

pub mod error;
pub mod memory;
pub mod store;
pub mod task;

pub use error::{ParseTaskFieldError, TaskStoreError};
pub use memory::InMemoryTaskStore;
pub use store::{NewTask, TaskChanges, TaskFilter, TaskSelector, TaskStore};
pub use task::{DUE_DATE_FORMAT, Task, TaskId, TaskPriority, TaskStatus, parse_due_date};
