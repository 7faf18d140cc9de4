use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Warning,
    Success,
}

/// In-app notification; `user_id = None` is a broadcast visible to everyone
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, kind, is_read, created_at";

impl Notification {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Option<Uuid>,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (id, user_id, title, message, kind)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(kind)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Notifications visible to `user_id` (their own plus broadcasts), newest first.
    /// Broadcasts report the user's own read state. Without a user every notification
    /// is returned with its shared read flag.
    pub async fn find_for_user(
        pool: &SqlitePool,
        user_id: Option<Uuid>,
        unread_only: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM (
                 SELECT n.id, n.user_id, n.title, n.message, n.kind, n.created_at, n.rowid AS seq,
                        (n.is_read = 1 OR EXISTS (
                            SELECT 1 FROM notification_reads r
                            WHERE r.notification_id = n.id AND r.user_id = $1
                        )) AS is_read
                 FROM notifications n
                 WHERE ($1 IS NULL OR n.user_id = $1 OR n.user_id IS NULL)
             )
             WHERE ($2 = 0 OR is_read = 0)
             ORDER BY created_at DESC, seq DESC"
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(pool)
        .await
    }

    /// Mark one notification read. A broadcast read on behalf of a user is recorded for
    /// that user only.
    pub async fn mark_read(
        pool: &SqlitePool,
        id: Uuid,
        reader: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(notification) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        match (notification.user_id, reader) {
            (None, Some(reader)) => {
                sqlx::query(
                    "INSERT OR IGNORE INTO notification_reads (notification_id, user_id)
                     VALUES ($1, $2)",
                )
                .bind(id)
                .bind(reader)
                .execute(pool)
                .await?;
                Ok(Some(Notification {
                    is_read: true,
                    ..notification
                }))
            }
            _ => {
                sqlx::query_as::<_, Notification>(&format!(
                    "UPDATE notifications SET is_read = 1 WHERE id = $1 RETURNING {NOTIFICATION_COLUMNS}"
                ))
                .bind(id)
                .fetch_optional(pool)
                .await
            }
        }
    }

    /// Returns how many notifications became read for `user_id`, or for everyone when
    /// no user is given.
    pub async fn mark_all_read(
        pool: &SqlitePool,
        user_id: Option<Uuid>,
    ) -> Result<u64, sqlx::Error> {
        let Some(user_id) = user_id else {
            let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE is_read = 0")
                .execute(pool)
                .await?;
            return Ok(result.rows_affected());
        };

        let mut tx = pool.begin().await?;
        let own = sqlx::query(
            "UPDATE notifications SET is_read = 1 WHERE is_read = 0 AND user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        let broadcasts = sqlx::query(
            "INSERT INTO notification_reads (notification_id, user_id)
             SELECT n.id, $1 FROM notifications n
             WHERE n.user_id IS NULL AND n.is_read = 0
               AND NOT EXISTS (
                   SELECT 1 FROM notification_reads r
                   WHERE r.notification_id = n.id AND r.user_id = $1
               )",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(own.rows_affected() + broadcasts.rows_affected())
    }
}
