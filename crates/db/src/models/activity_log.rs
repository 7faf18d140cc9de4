use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "entity_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityType {
    Project,
    Task,
    Resource,
    Material,
    Estimation,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Assigned,
    Unassigned,
    PriceChanged,
}

/// Audit trail entry for a mutation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ActivityLog {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: ActivityAction,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

const ACTIVITY_COLUMNS: &str = "id, project_id, entity_type, entity_id, action, details, created_at";

impl ActivityLog {
    pub async fn create<'e, E>(
        executor: E,
        project_id: Option<Uuid>,
        entity_type: EntityType,
        entity_id: Uuid,
        action: ActivityAction,
        details: Option<String>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ActivityLog>(&format!(
            "INSERT INTO activity_logs (id, project_id, entity_type, entity_id, action, details)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ACTIVITY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(entity_type)
        .bind(entity_id)
        .bind(action)
        .bind(details)
        .fetch_one(executor)
        .await
    }

    /// Newest first, optionally restricted to one project
    pub async fn find_recent(
        pool: &SqlitePool,
        project_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity_logs
             WHERE ($1 IS NULL OR project_id = $1)
             ORDER BY created_at DESC, rowid DESC
             LIMIT $2"
        ))
        .bind(project_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_entity(
        pool: &SqlitePool,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity_logs
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(entity_type)
        .bind(entity_id)
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

    #[tokio::test]
    async fn logs_survive_project_deletion_without_project_link() {
        let db = db().await;
        let project = Project::create(&db.pool, &CreateProject::named("Quay"), Uuid::new_v4())
            .await
            .unwrap();
        ActivityLog::create(
            &db.pool,
            Some(project.id),
            EntityType::Project,
            project.id,
            ActivityAction::Created,
            None,
        )
        .await
        .unwrap();

        Project::delete(&db.pool, project.id).await.unwrap();

        let logs = ActivityLog::find_by_entity(&db.pool, EntityType::Project, project.id)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].project_id, None);
    }

    #[tokio::test]
    async fn find_recent_respects_limit_and_order() {
        let db = db().await;
        let entity = Uuid::new_v4();
        for action in [ActivityAction::Created, ActivityAction::Updated, ActivityAction::Deleted] {
            ActivityLog::create(&db.pool, None, EntityType::Resource, entity, action, None)
                .await
                .unwrap();
        }

        let logs = ActivityLog::find_recent(&db.pool, None, 2).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, ActivityAction::Deleted);
        assert_eq!(logs[1].action, ActivityAction::Updated);
    }
}
