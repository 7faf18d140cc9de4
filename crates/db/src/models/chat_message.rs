use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "chat_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
}

const CHAT_COLUMNS: &str = "id, conversation_id, role, content, provider, created_at";

impl ChatMessage {
    pub async fn create(
        pool: &SqlitePool,
        conversation_id: Uuid,
        role: ChatRole,
        content: &str,
        provider: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            "INSERT INTO chat_messages (id, conversation_id, role, content, provider)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CHAT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .bind(provider)
        .fetch_one(pool)
        .await
    }

    /// Whole conversation, oldest first
    pub async fn find_by_conversation_id(
        pool: &SqlitePool,
        conversation_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chat_messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(conversation_id)
        .fetch_all(pool)
        .await
    }

    /// The most recent `limit` messages of a conversation, oldest first
    pub async fn find_recent(
        pool: &SqlitePool,
        conversation_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chat_messages
             WHERE conversation_id = $1
             ORDER BY created_at DESC, rowid DESC
             LIMIT $2"
        ))
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }

    pub async fn delete_by_conversation_id(
        pool: &SqlitePool,
        conversation_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::db;

    #[tokio::test]
    async fn recent_window_is_chronological() {
        let db = db().await;
        let conversation = Uuid::new_v4();
        for (i, role) in [ChatRole::User, ChatRole::Assistant, ChatRole::User].into_iter().enumerate() {
            ChatMessage::create(&db.pool, conversation, role, &format!("message {i}"), None)
                .await
                .unwrap();
        }

        let recent = ChatMessage::find_recent(&db.pool, conversation, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "message 1");
        assert_eq!(recent[1].content, "message 2");

        assert_eq!(ChatMessage::delete_by_conversation_id(&db.pool, conversation).await.unwrap(), 3);
        assert!(ChatMessage::find_by_conversation_id(&db.pool, conversation).await.unwrap().is_empty());
    }
}
