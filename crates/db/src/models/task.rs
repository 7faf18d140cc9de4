use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::project::StatusCount;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Delayed,
}

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid, // Foreign key to Project
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub progress: i64,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assignee_id: Option<Uuid>, // Foreign key to User
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub progress: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assignee_id: Option<Uuid>,
}

impl CreateTask {
    pub fn from_title(project_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            status: Some(TaskStatus::NotStarted),
            priority: None,
            progress: None,
            start_date: None,
            due_date: None,
            assignee_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub progress: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assignee_id: Option<Uuid>,
}

const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, progress, start_date, due_date, assignee_id, created_at, updated_at";

impl Task {
    /// Tasks of a project, earliest due date first; undated tasks last.
    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE project_id = $1
             ORDER BY due_date IS NULL, due_date ASC, created_at ASC, rowid ASC"
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let status = data.status.clone().unwrap_or_default();
        let priority = data.priority.clone().unwrap_or_default();
        let progress = match status {
            TaskStatus::Completed => 100,
            _ => data.progress.unwrap_or(0),
        };
        sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, project_id, title, description, status, priority, progress, start_date, due_date, assignee_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(task_id)
        .bind(data.project_id)
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(status)
        .bind(priority)
        .bind(progress)
        .bind(data.start_date)
        .bind(data.due_date)
        .bind(data.assignee_id)
        .fetch_one(executor)
        .await
    }

    /// Persist every mutable column of `task`.
    pub async fn update<'e, E>(executor: E, task: &Task) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET title = $2, description = $3, status = $4, priority = $5, progress = $6,
                 start_date = $7, due_date = $8, assignee_id = $9,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.status)
        .bind(&task.priority)
        .bind(task.progress)
        .bind(task.start_date)
        .bind(task.due_date)
        .bind(task.assignee_id)
        .fetch_one(executor)
        .await
    }

    /// Set a new status; completing a task pins its progress to 100.
    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET status = $2,
                 progress = CASE WHEN $2 = 'completed' THEN 100 ELSE progress END,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<StatusCount>, sqlx::Error> {
        sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM tasks GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }

    /// Tasks past their due date that are not completed, optionally limited to one project.
    pub async fn find_overdue(
        pool: &SqlitePool,
        today: NaiveDate,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE due_date IS NOT NULL
               AND due_date < $1
               AND status != 'completed'
               AND ($2 IS NULL OR project_id = $2)
             ORDER BY due_date ASC"
        ))
        .bind(today)
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        project::{CreateProject, Project},
        test_support::db,
    };

    async fn project(pool: &SqlitePool) -> Project {
        Project::create(pool, &CreateProject::named("Harbor Tower"), Uuid::new_v4())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn deleting_a_task_removes_it_from_listing() {
        let db = db().await;
        let project = project(&db.pool).await;
        let keep = Task::create(&db.pool, &CreateTask::from_title(project.id, "Pour slab"), Uuid::new_v4())
            .await
            .unwrap();
        let removed = Task::create(&db.pool, &CreateTask::from_title(project.id, "Frame walls"), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(Task::delete(&db.pool, removed.id).await.unwrap(), 1);

        let tasks = Task::find_by_project_id(&db.pool, project.id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, keep.id);
    }

    #[tokio::test]
    async fn completing_sets_progress_to_100() {
        let db = db().await;
        let project = project(&db.pool).await;
        let mut data = CreateTask::from_title(project.id, "Roofing");
        data.progress = Some(40);
        let task = Task::create(&db.pool, &data, Uuid::new_v4()).await.unwrap();
        assert_eq!(task.progress, 40);

        let task = Task::update_status(&db.pool, task.id, TaskStatus::Completed)
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
    }

    #[tokio::test]
    async fn project_progress_is_mean_of_task_progress() {
        let db = db().await;
        let project = project(&db.pool).await;
        for progress in [20, 50, 81] {
            let mut data = CreateTask::from_title(project.id, format!("Task {progress}"));
            data.progress = Some(progress);
            Task::create(&db.pool, &data, Uuid::new_v4()).await.unwrap();
        }

        Project::recompute_progress(&db.pool, project.id).await.unwrap();
        let project = Project::find_by_id(&db.pool, project.id).await.unwrap().unwrap();
        assert_eq!(project.progress, 50);
    }

    #[tokio::test]
    async fn overdue_excludes_completed_and_future_tasks() {
        let db = db().await;
        let project = project(&db.pool).await;
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();

        let mut late = CreateTask::from_title(project.id, "Late");
        late.due_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        let late = Task::create(&db.pool, &late, Uuid::new_v4()).await.unwrap();

        let mut done = CreateTask::from_title(project.id, "Done");
        done.due_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        done.status = Some(TaskStatus::Completed);
        Task::create(&db.pool, &done, Uuid::new_v4()).await.unwrap();

        let mut future = CreateTask::from_title(project.id, "Future");
        future.due_date = NaiveDate::from_ymd_opt(2026, 7, 1);
        Task::create(&db.pool, &future, Uuid::new_v4()).await.unwrap();

        let overdue = Task::find_overdue(&db.pool, today, None).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);
    }
}
