//! Database repositories for taskmate.
//!
//! This module provides data access for:
//! - Tasks, through the `TaskStore` seam

pub mod task;

pub use task::PostgresTaskStore;
