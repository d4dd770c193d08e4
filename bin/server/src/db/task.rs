//! PostgreSQL task store.
//!
//! Update and delete lock the selected row with `SELECT ... FOR UPDATE`
//! inside a transaction, so the field changes and the `updated_at` bump
//! commit together.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use std::str::FromStr;
use taskmate_tasks::{
    NewTask, Task, TaskChanges, TaskFilter, TaskId, TaskPriority, TaskSelector, TaskStatus,
    TaskStore, TaskStoreError,
};
use tracing::{debug, error, instrument};

const TASK_COLUMNS: &str =
    "id, title, description, status, priority, due_date, created_at, updated_at";

/// Row type for task queries.
#[derive(FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn try_into_task(self) -> Result<Task, sqlx::Error> {
        let decode = |e: taskmate_tasks::ParseTaskFieldError| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("task {}: {e}", self.id),
            )))
        };
        let status = TaskStatus::from_str(&self.status).map_err(decode)?;
        let priority = TaskPriority::from_str(&self.priority).map_err(decode)?;

        Ok(Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status,
            priority,
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn backend(e: sqlx::Error) -> TaskStoreError {
    error!(error = %e, "task query failed");
    TaskStoreError::Backend {
        reason: e.to_string(),
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>, TaskStoreError> {
    rows.into_iter()
        .map(|row| row.try_into_task().map_err(backend))
        .collect()
}

/// [`TaskStore`] backed by the `tasks` table.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    /// Creates a new store.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locks the selected row and returns its id.
    async fn lock_selected(
        tx: &mut Transaction<'_, Postgres>,
        selector: &TaskSelector,
    ) -> Result<TaskId, TaskStoreError> {
        let id: Option<(i64,)> = match selector {
            TaskSelector::Id(id) => {
                sqlx::query_as::<_, (i64,)>("SELECT id FROM tasks WHERE id = $1 FOR UPDATE")
                    .bind(*id)
                    .fetch_optional(&mut **tx)
                    .await
            }
            TaskSelector::TitleMatch(title) => {
                sqlx::query_as::<_, (i64,)>(
                    r#"
                    SELECT id FROM tasks
                    WHERE strpos(lower(title), lower($1)) > 0
                    ORDER BY id
                    LIMIT 1
                    FOR UPDATE
                    "#,
                )
                .bind(title)
                .fetch_optional(&mut **tx)
                .await
            }
        }
        .map_err(backend)?;

        id.map(|(id,)| id).ok_or_else(|| TaskStoreError::NotFound {
            selector: selector.clone(),
        })
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    #[instrument(skip(self, task), fields(title = %task.title))]
    async fn create(&self, task: NewTask) -> Result<Task, TaskStoreError> {
        let row: TaskRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO tasks (title, description, status, priority, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(TaskStatus::Todo.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let task = row.try_into_task().map_err(backend)?;
        debug!(task_id = task.id, "task created");
        Ok(task)
    }

    #[instrument(skip(self, changes), fields(selector = %selector))]
    async fn update(
        &self,
        selector: &TaskSelector,
        changes: TaskChanges,
    ) -> Result<Task, TaskStoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let id = Self::lock_selected(&mut tx, selector).await?;

        let row: TaskRow = sqlx::query_as(&format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                due_date = COALESCE($6, due_date),
                updated_at = now()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.priority.map(|p| p.as_str()))
        .bind(changes.due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;

        let task = row.try_into_task().map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        debug!(task_id = id, "task updated");
        Ok(task)
    }

    #[instrument(skip(self), fields(selector = %selector))]
    async fn delete(&self, selector: &TaskSelector) -> Result<Task, TaskStoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let id = Self::lock_selected(&mut tx, selector).await?;

        let row: TaskRow = sqlx::query_as(&format!(
            "DELETE FROM tasks WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;

        let task = row.try_into_task().map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        debug!(task_id = id, "task deleted");
        Ok(task)
    }

    async fn list(&self) -> Result<Vec<Task>, TaskStoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        into_tasks(rows)
    }

    #[instrument(skip(self))]
    async fn filter(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskStoreError> {
        let mut query = filter_query(filter);
        let rows: Vec<TaskRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        into_tasks(rows)
    }
}

fn filter_query(filter: &TaskFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE TRUE"));
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        query.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(before) = filter.due_before {
        query.push(" AND due_date <= ").push_bind(before);
    }
    if let Some(after) = filter.due_after {
        query.push(" AND due_date >= ").push_bind(after);
    }
    query.push(" ORDER BY created_at DESC, id DESC");
    query
}
