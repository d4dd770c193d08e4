//! In-memory task store.

use crate::error::TaskStoreError;
use crate::store::{NewTask, TaskChanges, TaskFilter, TaskSelector, TaskStore};
use crate::task::{Task, TaskId, TaskStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct Inner {
    next_id: TaskId,
    tasks: BTreeMap<TaskId, Task>,
}

impl Inner {
    /// Lowest matching id first, so title matches resolve deterministically.
    fn resolve(&self, selector: &TaskSelector) -> Result<TaskId, TaskStoreError> {
        self.tasks
            .values()
            .find(|task| selector.matches(task))
            .map(|task| task.id)
            .ok_or_else(|| TaskStoreError::NotFound {
                selector: selector.clone(),
            })
    }

    fn newest_first(&self, filter: &TaskFilter) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        tasks
    }
}

/// A [`TaskStore`] kept in process memory.
///
/// Every operation runs inside one critical section, which makes each
/// mutation atomic.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    inner: Mutex<Inner>,
}

impl InMemoryTaskStore {
    /// Creates an empty store. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tasks.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.tasks.len()
    }

    /// Returns true if no tasks are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.tasks.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    #[instrument(skip(self, task), fields(title = %task.title))]
    async fn create(&self, task: NewTask) -> Result<Task, TaskStoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let now = Utc::now();
        let created = Task {
            id: inner.next_id,
            title: task.title,
            description: task.description,
            status: TaskStatus::Todo,
            priority: task.priority,
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
        };
        inner.tasks.insert(created.id, created.clone());
        debug!(task_id = created.id, "task created");
        Ok(created)
    }

    #[instrument(skip(self, changes), fields(selector = %selector))]
    async fn update(
        &self,
        selector: &TaskSelector,
        changes: TaskChanges,
    ) -> Result<Task, TaskStoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.resolve(selector)?;
        let task = inner
            .tasks
            .get_mut(&id)
            .ok_or_else(|| TaskStoreError::NotFound {
                selector: selector.clone(),
            })?;
        changes.apply_to(task);
        task.updated_at = Utc::now();
        debug!(task_id = id, "task updated");
        Ok(task.clone())
    }

    #[instrument(skip(self), fields(selector = %selector))]
    async fn delete(&self, selector: &TaskSelector) -> Result<Task, TaskStoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.resolve(selector)?;
        let removed = inner
            .tasks
            .remove(&id)
            .ok_or_else(|| TaskStoreError::NotFound {
                selector: selector.clone(),
            })?;
        debug!(task_id = id, "task deleted");
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<Task>, TaskStoreError> {
        Ok(self.inner.lock().await.newest_first(&TaskFilter::default()))
    }

    async fn filter(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskStoreError> {
        Ok(self.inner.lock().await.newest_first(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskPriority;

    #[tokio::test]
    async fn create_assigns_increasing_ids_and_defaults() {
        let store = InMemoryTaskStore::new();

        let first = store.create(NewTask::new("buy milk")).await.unwrap();
        let second = store.create(NewTask::new("walk dog")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.status, TaskStatus::Todo);
        assert_eq!(first.priority, TaskPriority::Medium);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn update_by_title_picks_lowest_id_and_bumps_timestamp() {
        let store = InMemoryTaskStore::new();
        let first = store.create(NewTask::new("Call mom")).await.unwrap();
        store.create(NewTask::new("call MOM again")).await.unwrap();

        let updated = store
            .update(
                &TaskSelector::TitleMatch("call mom".to_string()),
                TaskChanges {
                    status: Some(TaskStatus::Done),
                    ..TaskChanges::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, first.id);
        assert_eq!(updated.status, TaskStatus::Done);
        assert!(updated.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn update_missing_task_is_not_found() {
        let store = InMemoryTaskStore::new();
        let err = store
            .update(&TaskSelector::Id(999), TaskChanges::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TaskStoreError::NotFound {
                selector: TaskSelector::Id(999)
            }
        );
    }

    #[tokio::test]
    async fn delete_removes_and_returns_task() {
        let store = InMemoryTaskStore::new();
        let task = store.create(NewTask::new("temp")).await.unwrap();

        let removed = store.delete(&TaskSelector::Id(task.id)).await.unwrap();

        assert_eq!(removed, task);
        assert!(store.is_empty().await);
        assert!(store.delete(&TaskSelector::Id(task.id)).await.is_err());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let store = InMemoryTaskStore::new();
        store.create(NewTask::new("older")).await.unwrap();
        store.create(NewTask::new("newer")).await.unwrap();

        let tasks = store.list().await.unwrap();

        assert_eq!(tasks[0].title, "newer");
        assert_eq!(tasks[1].title, "older");
    }

    #[tokio::test]
    async fn filter_by_priority() {
        let store = InMemoryTaskStore::new();
        store
            .create(NewTask::new("a").with_priority(TaskPriority::High))
            .await
            .unwrap();
        store.create(NewTask::new("b")).await.unwrap();

        let high = store
            .filter(&TaskFilter {
                priority: Some(TaskPriority::High),
                ..TaskFilter::default()
            })
            .await
            .unwrap();

        assert_eq!(high.len(), 1);
        assert_eq!(high[0].title, "a");
    }
}
