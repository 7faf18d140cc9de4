use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "resource_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    Human,
    Material,
    Equipment,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub resource_type: ResourceType,
    pub description: Option<String>,
    pub cost_per_unit: f64,
    pub unit: Option<String>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateResource {
    pub name: String,
    pub resource_type: ResourceType,
    pub description: Option<String>,
    pub cost_per_unit: Option<f64>,
    pub unit: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateResource {
    pub name: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub description: Option<String>,
    pub cost_per_unit: Option<f64>,
    pub unit: Option<String>,
    pub available: Option<bool>,
}

/// Allocation of a resource to a task
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TaskResource {
    pub task_id: Uuid,
    pub resource_id: Uuid,
    pub allocation_percent: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AssignResource {
    pub resource_id: Uuid,
    pub allocation_percent: i64,
}

/// A resource together with its allocation on a specific task
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AllocatedResource {
    pub task_id: Uuid,
    pub resource_id: Uuid,
    pub name: String,
    pub resource_type: ResourceType,
    pub cost_per_unit: f64,
    pub unit: Option<String>,
    pub allocation_percent: i64,
}

const RESOURCE_COLUMNS: &str =
    "id, name, resource_type, description, cost_per_unit, unit, available, created_at, updated_at";

impl Resource {
    pub async fn find_all(
        pool: &SqlitePool,
        resource_type: Option<ResourceType>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Resource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources
             WHERE ($1 IS NULL OR resource_type = $1)
             ORDER BY name ASC"
        ))
        .bind(resource_type)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Resource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateResource,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Resource>(&format!(
            "INSERT INTO resources (id, name, resource_type, description, cost_per_unit, unit, available)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(id)
        .bind(data.name.trim())
        .bind(&data.resource_type)
        .bind(&data.description)
        .bind(data.cost_per_unit.unwrap_or(0.0))
        .bind(&data.unit)
        .bind(data.available.unwrap_or(true))
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(executor: E, resource: &Resource) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Resource>(&format!(
            "UPDATE resources
             SET name = $2, resource_type = $3, description = $4, cost_per_unit = $5,
                 unit = $6, available = $7, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(resource.id)
        .bind(&resource.name)
        .bind(&resource.resource_type)
        .bind(&resource.description)
        .bind(resource.cost_per_unit)
        .bind(&resource.unit)
        .bind(resource.available)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

impl TaskResource {
    /// Insert or replace the allocation of `resource_id` on `task_id`.
    pub async fn upsert<'e, E>(
        executor: E,
        task_id: Uuid,
        resource_id: Uuid,
        allocation_percent: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TaskResource>(
            "INSERT INTO task_resources (task_id, resource_id, allocation_percent)
             VALUES ($1, $2, $3)
             ON CONFLICT(task_id, resource_id) DO UPDATE SET
                 allocation_percent = excluded.allocation_percent
             RETURNING task_id, resource_id, allocation_percent, created_at",
        )
        .bind(task_id)
        .bind(resource_id)
        .bind(allocation_percent)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(
        executor: E,
        task_id: Uuid,
        resource_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("DELETE FROM task_resources WHERE task_id = $1 AND resource_id = $2")
                .bind(task_id)
                .bind(resource_id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<AllocatedResource>, sqlx::Error> {
        sqlx::query_as::<_, AllocatedResource>(
            "SELECT tr.task_id, tr.resource_id, r.name, r.resource_type, r.cost_per_unit, r.unit,
                    tr.allocation_percent
             FROM task_resources tr
             JOIN resources r ON r.id = tr.resource_id
             WHERE tr.task_id = $1
             ORDER BY r.name ASC",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<AllocatedResource>, sqlx::Error> {
        sqlx::query_as::<_, AllocatedResource>(
            "SELECT tr.task_id, tr.resource_id, r.name, r.resource_type, r.cost_per_unit, r.unit,
                    tr.allocation_percent
             FROM task_resources tr
             JOIN resources r ON r.id = tr.resource_id
             JOIN tasks t ON t.id = tr.task_id
             WHERE t.project_id = $1
             ORDER BY r.name ASC",
        )
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
        task::{CreateTask, Task},
        test_support::db,
    };

    fn crane() -> CreateResource {
        CreateResource {
            name: "Tower crane".to_string(),
            resource_type: ResourceType::Equipment,
            description: None,
            cost_per_unit: Some(95.0),
            unit: Some("hour".to_string()),
            available: None,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_allocation() {
        let db = db().await;
        let project = Project::create(&db.pool, &CreateProject::named("Depot"), Uuid::new_v4())
            .await
            .unwrap();
        let task = Task::create(&db.pool, &CreateTask::from_title(project.id, "Lift beams"), Uuid::new_v4())
            .await
            .unwrap();
        let resource = Resource::create(&db.pool, &crane(), Uuid::new_v4()).await.unwrap();
        assert!(resource.available);

        TaskResource::upsert(&db.pool, task.id, resource.id, 50).await.unwrap();
        TaskResource::upsert(&db.pool, task.id, resource.id, 75).await.unwrap();

        let allocated = TaskResource::find_by_task_id(&db.pool, task.id).await.unwrap();
        assert_eq!(allocated.len(), 1);
        assert_eq!(allocated[0].allocation_percent, 75);
        assert_eq!(allocated[0].name, "Tower crane");

        let by_project = TaskResource::find_by_project_id(&db.pool, project.id).await.unwrap();
        assert_eq!(by_project.len(), 1);
    }

    #[tokio::test]
    async fn find_all_filters_by_type() {
        let db = db().await;
        Resource::create(&db.pool, &crane(), Uuid::new_v4()).await.unwrap();
        let mut mason = crane();
        mason.name = "Mason".to_string();
        mason.resource_type = ResourceType::Human;
        Resource::create(&db.pool, &mason, Uuid::new_v4()).await.unwrap();

        let humans = Resource::find_all(&db.pool, Some(ResourceType::Human)).await.unwrap();
        assert_eq!(humans.len(), 1);
        assert_eq!(humans[0].name, "Mason");
        assert_eq!(Resource::find_all(&db.pool, None).await.unwrap().len(), 2);
    }
}
