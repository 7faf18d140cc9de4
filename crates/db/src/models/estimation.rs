use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::project::ProjectCategory;

/// Finish quality of a build; drives the quality multiplier of an estimation.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "quality_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QualityLevel {
    Basic,
    #[default]
    Standard,
    Premium,
}

/// Group of materials an estimation is broken down into
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MaterialGroup {
    Structure,
    Finishing,
    Services,
}

/// Where a line item's unit price came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PriceSource {
    Default,
    Catalog,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EstimationRequest {
    pub area_sqm: f64,
    #[serde(default)]
    pub category: ProjectCategory,
    #[serde(default)]
    pub quality: QualityLevel,
    pub wastage_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct EstimationLineItem {
    pub material: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub price_source: PriceSource,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct CategoryEstimate {
    pub group: MaterialGroup,
    pub items: Vec<EstimationLineItem>,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct EstimationResult {
    pub area_sqm: f64,
    pub category: ProjectCategory,
    pub quality: QualityLevel,
    pub wastage_percent: f64,
    pub category_multiplier: f64,
    pub quality_multiplier: f64,
    pub wastage_factor: f64,
    pub categories: Vec<CategoryEstimate>,
    pub total_cost: f64,
    pub cost_per_sqm: f64,
}

/// Saved set of estimation parameters
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct EstimationPreset {
    pub id: Uuid,
    pub name: String,
    pub category: ProjectCategory,
    pub quality: QualityLevel,
    pub wastage_percent: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateEstimationPreset {
    pub name: String,
    #[serde(default)]
    pub category: ProjectCategory,
    #[serde(default)]
    pub quality: QualityLevel,
    pub wastage_percent: Option<f64>,
    pub notes: Option<String>,
}

impl EstimationPreset {
    pub fn to_request(&self, area_sqm: f64) -> EstimationRequest {
        EstimationRequest {
            area_sqm,
            category: self.category,
            quality: self.quality,
            wastage_percent: Some(self.wastage_percent),
        }
    }
}

/// Estimation saved against a project
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProjectEstimation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub area_sqm: f64,
    pub category: ProjectCategory,
    pub quality: QualityLevel,
    pub wastage_percent: f64,
    pub total_cost: f64,
    #[serde(skip)]
    #[ts(skip)]
    pub breakdown: String, // JSON-serialized EstimationResult
    pub created_at: DateTime<Utc>,
}

impl ProjectEstimation {
    /// Parse the breakdown JSON into an EstimationResult
    pub fn parsed_breakdown(&self) -> Option<EstimationResult> {
        serde_json::from_str(&self.breakdown).ok()
    }

    pub fn with_breakdown(self) -> ProjectEstimationWithBreakdown {
        let breakdown = self.parsed_breakdown();
        ProjectEstimationWithBreakdown {
            estimation: self,
            breakdown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectEstimationWithBreakdown {
    #[serde(flatten)]
    #[ts(flatten)]
    pub estimation: ProjectEstimation,
    pub breakdown: Option<EstimationResult>,
}

const PRESET_COLUMNS: &str = "id, name, category, quality, wastage_percent, notes, created_at";
const ESTIMATION_COLUMNS: &str = "id, project_id, area_sqm, category, quality, wastage_percent, total_cost, breakdown, created_at";

impl EstimationPreset {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, EstimationPreset>(&format!(
            "SELECT {PRESET_COLUMNS} FROM estimation_presets ORDER BY name ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EstimationPreset>(&format!(
            "SELECT {PRESET_COLUMNS} FROM estimation_presets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateEstimationPreset,
        wastage_percent: f64,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, EstimationPreset>(&format!(
            "INSERT INTO estimation_presets (id, name, category, quality, wastage_percent, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PRESET_COLUMNS}"
        ))
        .bind(id)
        .bind(data.name.trim())
        .bind(data.category)
        .bind(data.quality)
        .bind(wastage_percent)
        .bind(&data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM estimation_presets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl ProjectEstimation {
    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        result: &EstimationResult,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let breakdown =
            serde_json::to_string(result).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        sqlx::query_as::<_, ProjectEstimation>(&format!(
            "INSERT INTO project_estimations
                 (id, project_id, area_sqm, category, quality, wastage_percent, total_cost, breakdown)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {ESTIMATION_COLUMNS}"
        ))
        .bind(id)
        .bind(project_id)
        .bind(result.area_sqm)
        .bind(result.category)
        .bind(result.quality)
        .bind(result.wastage_percent)
        .bind(result.total_cost)
        .bind(breakdown)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectEstimation>(&format!(
            "SELECT {ESTIMATION_COLUMNS} FROM project_estimations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first
    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectEstimation>(&format!(
            "SELECT {ESTIMATION_COLUMNS} FROM project_estimations
             WHERE project_id = $1
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_latest_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectEstimation>(&format!(
            "SELECT {ESTIMATION_COLUMNS} FROM project_estimations
             WHERE project_id = $1
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1"
        ))
        .bind(project_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_estimations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        project::{CreateProject, Project},
        test_support::db,
    };

    fn sample_result() -> EstimationResult {
        EstimationResult {
            area_sqm: 100.0,
            category: ProjectCategory::Residential,
            quality: QualityLevel::Premium,
            wastage_percent: 5.0,
            category_multiplier: 1.0,
            quality_multiplier: 1.35,
            wastage_factor: 1.05,
            categories: vec![CategoryEstimate {
                group: MaterialGroup::Structure,
                items: vec![EstimationLineItem {
                    material: "Cement".to_string(),
                    unit: "bag".to_string(),
                    quantity: 42.0,
                    unit_price: 8.5,
                    price_source: PriceSource::Default,
                    cost: 481.95,
                }],
                total: 481.95,
            }],
            total_cost: 481.95,
            cost_per_sqm: 4.82,
        }
    }

    #[tokio::test]
    async fn saved_estimation_keeps_breakdown() {
        let db = db().await;
        let project = Project::create(&db.pool, &CreateProject::named("Mill Lofts"), Uuid::new_v4())
            .await
            .unwrap();
        let saved = ProjectEstimation::create(&db.pool, project.id, &sample_result(), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(saved.quality, QualityLevel::Premium);
        let breakdown = saved.parsed_breakdown().unwrap();
        assert_eq!(breakdown.categories.len(), 1);
        assert_eq!(breakdown.categories[0].items[0].material, "Cement");

        let latest = ProjectEstimation::find_latest_by_project_id(&db.pool, project.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, saved.id);

        let json = serde_json::to_value(saved.with_breakdown()).unwrap();
        assert_eq!(json["total_cost"], 481.95);
        assert_eq!(json["breakdown"]["categories"][0]["group"], "structure");
    }

    #[tokio::test]
    async fn estimations_are_removed_with_their_project() {
        let db = db().await;
        let project = Project::create(&db.pool, &CreateProject::named("Temp"), Uuid::new_v4())
            .await
            .unwrap();
        ProjectEstimation::create(&db.pool, project.id, &sample_result(), Uuid::new_v4())
            .await
            .unwrap();

        Project::delete(&db.pool, project.id).await.unwrap();
        let remaining = ProjectEstimation::find_by_project_id(&db.pool, project.id)
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }
}
