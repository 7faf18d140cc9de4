use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "analysis_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisType {
    Market,
    ProjectRisk,
}

/// Stored result of an LLM-backed analysis
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AiAnalysis {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub analysis_type: AnalysisType,
    pub provider: String,
    pub input: String,  // JSON-serialized request context
    pub result: String, // JSON-serialized analysis
    pub created_at: DateTime<Utc>,
}

impl AiAnalysis {
    /// Parse the result JSON, falling back to the raw text
    pub fn parsed_result(&self) -> serde_json::Value {
        serde_json::from_str(&self.result)
            .unwrap_or_else(|_| serde_json::Value::String(self.result.clone()))
    }

    pub async fn create(
        pool: &SqlitePool,
        project_id: Option<Uuid>,
        analysis_type: AnalysisType,
        provider: &str,
        input: &str,
        result: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AiAnalysis>(
            "INSERT INTO ai_analyses (id, project_id, analysis_type, provider, input, result)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, project_id, analysis_type, provider, input, result, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(analysis_type)
        .bind(provider)
        .bind(input)
        .bind(result)
        .fetch_one(pool)
        .await
    }

    pub async fn find_recent(
        pool: &SqlitePool,
        project_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AiAnalysis>(
            "SELECT id, project_id, analysis_type, provider, input, result, created_at
             FROM ai_analyses
             WHERE ($1 IS NULL OR project_id = $1)
             ORDER BY created_at DESC, rowid DESC
             LIMIT $2",
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::db;

    #[tokio::test]
    async fn stores_and_parses_result() {
        let db = db().await;
        let analysis = AiAnalysis::create(
            &db.pool,
            None,
            AnalysisType::Market,
            "anthropic",
            r#"{"region":"Algarve"}"#,
            r#"{"trend":"rising"}"#,
        )
        .await
        .unwrap();

        assert_eq!(analysis.parsed_result()["trend"], "rising");
        let recent = AiAnalysis::find_recent(&db.pool, None, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].analysis_type, AnalysisType::Market);
    }
}
