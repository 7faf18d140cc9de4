use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

/// Kind of construction; drives the category multiplier of material estimations.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "project_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProjectCategory {
    #[default]
    Residential,
    Commercial,
    Industrial,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: ProjectStatus,
    pub category: ProjectCategory,
    pub budget: f64,
    pub spent: f64,
    pub progress: i64, // Mean progress of the project's tasks
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub manager_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<ProjectStatus>,
    pub category: Option<ProjectCategory>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub manager_id: Option<Uuid>,
}

impl CreateProject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            location: None,
            status: None,
            category: None,
            budget: None,
            spent: None,
            start_date: None,
            end_date: None,
            manager_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<ProjectStatus>,
    pub category: Option<ProjectCategory>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

const PROJECT_COLUMNS: &str = "id, name, description, location, status, category, budget, spent, progress, start_date, end_date, manager_id, created_at, updated_at";

impl Project {
    pub async fn find_all(
        pool: &SqlitePool,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match status {
            Some(status) => {
                sqlx::query_as::<_, Project>(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects WHERE status = $1
                     ORDER BY created_at DESC, rowid DESC"
                ))
                .bind(status)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Project>(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, rowid DESC"
                ))
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateProject,
        project_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let status = data.status.clone().unwrap_or_default();
        let category = data.category.unwrap_or_default();
        sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (id, name, description, location, status, category, budget, spent, start_date, end_date, manager_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(project_id)
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(&data.location)
        .bind(status)
        .bind(category)
        .bind(data.budget.unwrap_or(0.0))
        .bind(data.spent.unwrap_or(0.0))
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.manager_id)
        .fetch_one(executor)
        .await
    }

    /// Persist every mutable column of `project`.
    pub async fn update<'e, E>(executor: E, project: &Project) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects
             SET name = $2, description = $3, location = $4, status = $5, category = $6,
                 budget = $7, spent = $8, start_date = $9, end_date = $10, manager_id = $11,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.location)
        .bind(&project.status)
        .bind(project.category)
        .bind(project.budget)
        .bind(project.spent)
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.manager_id)
        .fetch_one(executor)
        .await
    }

    /// Recompute `progress` as the rounded mean progress of the project's tasks (0 without tasks).
    pub async fn recompute_progress<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE projects
             SET progress = COALESCE(
                     (SELECT CAST(ROUND(AVG(progress)) AS INTEGER) FROM tasks WHERE project_id = $1),
                     0),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<StatusCount>, sqlx::Error> {
        sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM projects GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }

    /// (total budget, total spent, average progress) across all projects
    pub async fn totals(pool: &SqlitePool) -> Result<(f64, f64, f64), sqlx::Error> {
        sqlx::query_as::<_, (f64, f64, f64)>(
            "SELECT COALESCE(SUM(budget), 0.0), COALESCE(SUM(spent), 0.0), COALESCE(AVG(progress), 0.0)
             FROM projects",
        )
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::db;

    #[tokio::test]
    async fn create_then_fetch_returns_same_fields() {
        let db = db().await;
        let mut data = CreateProject::named("Riverside Villas");
        data.location = Some("Lisbon".to_string());
        data.category = Some(ProjectCategory::Commercial);
        data.budget = Some(1_250_000.0);
        data.start_date = NaiveDate::from_ymd_opt(2026, 3, 1);

        let created = Project::create(&db.pool, &data, Uuid::new_v4()).await.unwrap();
        let fetched = Project::find_by_id(&db.pool, created.id).await.unwrap().unwrap();

        assert_eq!(fetched.name, "Riverside Villas");
        assert_eq!(fetched.location.as_deref(), Some("Lisbon"));
        assert_eq!(fetched.status, ProjectStatus::Planning);
        assert_eq!(fetched.category, ProjectCategory::Commercial);
        assert_eq!(fetched.budget, 1_250_000.0);
        assert_eq!(fetched.progress, 0);
        assert_eq!(fetched.start_date, data.start_date);
    }

    #[tokio::test]
    async fn find_all_filters_by_status() {
        let db = db().await;
        let mut active = CreateProject::named("Active");
        active.status = Some(ProjectStatus::InProgress);
        Project::create(&db.pool, &active, Uuid::new_v4()).await.unwrap();
        Project::create(&db.pool, &CreateProject::named("Draft"), Uuid::new_v4())
            .await
            .unwrap();

        let all = Project::find_all(&db.pool, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let in_progress = Project::find_all(&db.pool, Some(ProjectStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].name, "Active");
    }

    #[tokio::test]
    async fn recompute_progress_without_tasks_is_zero() {
        let db = db().await;
        let project = Project::create(&db.pool, &CreateProject::named("Empty"), Uuid::new_v4())
            .await
            .unwrap();
        Project::recompute_progress(&db.pool, project.id).await.unwrap();
        let project = Project::find_by_id(&db.pool, project.id).await.unwrap().unwrap();
        assert_eq!(project.progress, 0);
    }
}
