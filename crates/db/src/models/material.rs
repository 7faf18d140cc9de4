use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub current_price: f64,
    pub supplier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMaterial {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub current_price: f64,
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateMaterial {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub current_price: Option<f64>,
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MaterialPriceHistory {
    pub id: Uuid,
    pub material_id: Uuid,
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Per-category aggregate of the material catalog
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MaterialCategorySummary {
    pub category: String,
    pub item_count: i64,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

const MATERIAL_COLUMNS: &str =
    "id, name, category, unit, current_price, supplier, created_at, updated_at";

impl Material {
    pub async fn find_all(
        pool: &SqlitePool,
        category: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials
             WHERE ($1 IS NULL OR category = $1 COLLATE NOCASE)
             ORDER BY category ASC, name ASC"
        ))
        .bind(category)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE name = $1"
        ))
        .bind(name.trim())
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateMaterial,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Material>(&format!(
            "INSERT INTO materials (id, name, category, unit, current_price, supplier)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {MATERIAL_COLUMNS}"
        ))
        .bind(id)
        .bind(data.name.trim())
        .bind(data.category.trim())
        .bind(data.unit.trim())
        .bind(data.current_price)
        .bind(&data.supplier)
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(executor: E, material: &Material) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Material>(&format!(
            "UPDATE materials
             SET name = $2, category = $3, unit = $4, current_price = $5, supplier = $6,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {MATERIAL_COLUMNS}"
        ))
        .bind(material.id)
        .bind(&material.name)
        .bind(&material.category)
        .bind(&material.unit)
        .bind(material.current_price)
        .bind(&material.supplier)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn category_summary(
        pool: &SqlitePool,
    ) -> Result<Vec<MaterialCategorySummary>, sqlx::Error> {
        sqlx::query_as::<_, MaterialCategorySummary>(
            "SELECT category,
                    COUNT(*) AS item_count,
                    CAST(AVG(current_price) AS REAL) AS average_price,
                    CAST(MIN(current_price) AS REAL) AS min_price,
                    CAST(MAX(current_price) AS REAL) AS max_price
             FROM materials
             GROUP BY category
             ORDER BY category ASC",
        )
        .fetch_all(pool)
        .await
    }
}

impl MaterialPriceHistory {
    pub async fn record<'e, E>(
        executor: E,
        material_id: Uuid,
        price: f64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, MaterialPriceHistory>(
            "INSERT INTO material_price_history (id, material_id, price)
             VALUES ($1, $2, $3)
             RETURNING id, material_id, price, recorded_at",
        )
        .bind(Uuid::new_v4())
        .bind(material_id)
        .bind(price)
        .fetch_one(executor)
        .await
    }

    /// Newest first
    pub async fn find_by_material_id(
        pool: &SqlitePool,
        material_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaterialPriceHistory>(
            "SELECT id, material_id, price, recorded_at
             FROM material_price_history
             WHERE material_id = $1
             ORDER BY recorded_at DESC, rowid DESC",
        )
        .bind(material_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::db;

    fn cement(price: f64) -> CreateMaterial {
        CreateMaterial {
            name: "Cement".to_string(),
            category: "structure".to_string(),
            unit: "bag".to_string(),
            current_price: price,
            supplier: Some("Northwind Aggregates".to_string()),
        }
    }

    #[tokio::test]
    async fn names_are_case_insensitive() {
        let db = db().await;
        Material::create(&db.pool, &cement(9.0), Uuid::new_v4()).await.unwrap();

        let found = Material::find_by_name(&db.pool, "CEMENT").await.unwrap();
        assert!(found.is_some());

        let dup = Material::create(&db.pool, &cement(9.5), Uuid::new_v4()).await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn price_history_is_newest_first() {
        let db = db().await;
        let material = Material::create(&db.pool, &cement(9.0), Uuid::new_v4()).await.unwrap();
        MaterialPriceHistory::record(&db.pool, material.id, 9.0).await.unwrap();
        MaterialPriceHistory::record(&db.pool, material.id, 9.75).await.unwrap();

        let history = MaterialPriceHistory::find_by_material_id(&db.pool, material.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].price, 9.75);
    }

    #[tokio::test]
    async fn category_summary_aggregates_prices() {
        let db = db().await;
        Material::create(&db.pool, &cement(8.0), Uuid::new_v4()).await.unwrap();
        let mut steel = cement(2.0);
        steel.name = "Steel rebar".to_string();
        Material::create(&db.pool, &steel, Uuid::new_v4()).await.unwrap();

        let summary = Material::category_summary(&db.pool).await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].item_count, 2);
        assert_eq!(summary[0].average_price, 5.0);
        assert_eq!(summary[0].min_price, 2.0);
        assert_eq!(summary[0].max_price, 8.0);
    }
}
