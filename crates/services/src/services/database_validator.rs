//! Startup check that the schema is migrated and every table the services rely on exists

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

pub const REQUIRED_TABLES: &[&str] = &[
    "users",
    "projects",
    "tasks",
    "resources",
    "task_resources",
    "materials",
    "material_price_history",
    "real_estate_markets",
    "estimation_presets",
    "project_estimations",
    "activity_logs",
    "ai_analyses",
    "notifications",
    "notification_reads",
    "chat_messages",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseValidationError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        if !self.table_exists("_sqlx_migrations").await? {
            warn!("Database has no migration table");
            return Ok(ValidationResult {
                is_initialized: false,
                migrations_applied: 0,
                latest_migration: None,
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            });
        }

        let migrations_applied =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;
        let latest_migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1
             ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let mut missing_tables = Vec::new();
        for table in REQUIRED_TABLES {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }

        let result = ValidationResult {
            is_initialized: true,
            migrations_applied: migrations_applied as usize,
            latest_migration,
            missing_tables,
        };
        if result.is_ok() {
            info!(
                migrations_applied = result.migrations_applied,
                latest = ?result.latest_migration,
                "Database schema validated"
            );
        } else {
            warn!(missing = ?result.missing_tables, "Database schema incomplete");
        }
        Ok(result)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.is_initialized {
            "Database not initialized - migrations need to be run".to_string()
        } else if !self.missing_tables.is_empty() {
            format!("Missing tables: {}", self.missing_tables.join(", "))
        } else {
            format!("Database OK - {} migrations applied", self.migrations_applied)
        }
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    #[tokio::test]
    async fn migrated_database_has_every_table() {
        let db = DBService::new_in_memory().await.unwrap();
        let result = DatabaseValidator::new(db.pool.clone()).validate().await.unwrap();
        assert!(result.is_ok(), "{}", result.summary());
        assert_eq!(result.migrations_applied, 1);
        assert_eq!(result.latest_migration.as_deref(), Some("init"));
    }

    #[tokio::test]
    async fn empty_database_is_not_initialized() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let result = DatabaseValidator::new(pool).validate().await.unwrap();
        assert!(!result.is_initialized);
        assert_eq!(result.missing_tables.len(), REQUIRED_TABLES.len());
        assert!(!result.is_ok());
    }
}
