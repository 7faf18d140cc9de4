use db::models::activity_log::ActivityLog;
use sqlx::SqlitePool;
use uuid::Uuid;

pub const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
pub const MAX_ACTIVITY_LIMIT: i64 = 200;

pub struct ActivityService;

impl ActivityService {
    /// Most recent activity, newest first. The limit is clamped to `1..=MAX_ACTIVITY_LIMIT`.
    pub async fn list(
        pool: &SqlitePool,
        project_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<ActivityLog>, sqlx::Error> {
        let limit = limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT);
        ActivityLog::find_recent(pool, project_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::activity_log::{ActivityAction, EntityType},
    };

    use super::*;

    #[tokio::test]
    async fn limit_is_clamped() {
        let db = DBService::new_in_memory().await.unwrap();
        for _ in 0..3 {
            ActivityLog::create(
                &db.pool,
                None,
                EntityType::Resource,
                Uuid::new_v4(),
                ActivityAction::Created,
                None,
            )
            .await
            .unwrap();
        }

        assert_eq!(ActivityService::list(&db.pool, None, Some(0)).await.unwrap().len(), 1);
        assert_eq!(ActivityService::list(&db.pool, None, Some(2)).await.unwrap().len(), 2);
        assert_eq!(ActivityService::list(&db.pool, None, None).await.unwrap().len(), 3);
    }
}
