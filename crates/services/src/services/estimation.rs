//! Material cost estimation: area × rate × category × quality × wastage over static lookup tables.

use std::collections::HashMap;

use db::models::{
    activity_log::{ActivityAction, ActivityLog, EntityType},
    estimation::{
        CategoryEstimate, CreateEstimationPreset, EstimationLineItem, EstimationPreset,
        EstimationRequest, EstimationResult, MaterialGroup, PriceSource, ProjectEstimation,
        QualityLevel,
    },
    material::Material,
    project::{Project, ProjectCategory},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_WASTAGE_PERCENT: f64 = 5.0;
pub const MAX_WASTAGE_PERCENT: f64 = 50.0;

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("project not found")]
    ProjectNotFound,
    #[error("estimation not found")]
    EstimationNotFound,
    #[error("estimation preset not found")]
    PresetNotFound,
}

struct MaterialRate {
    group: MaterialGroup,
    material: &'static str,
    unit: &'static str,
    quantity_per_sqm: f64,
    default_price: f64,
}

const fn rate(
    group: MaterialGroup,
    material: &'static str,
    unit: &'static str,
    quantity_per_sqm: f64,
    default_price: f64,
) -> MaterialRate {
    MaterialRate {
        group,
        material,
        unit,
        quantity_per_sqm,
        default_price,
    }
}

const MATERIAL_RATES: &[MaterialRate] = &[
    rate(MaterialGroup::Structure, "Cement", "bag", 0.40, 8.50),
    rate(MaterialGroup::Structure, "Steel rebar", "kg", 4.00, 1.10),
    rate(MaterialGroup::Structure, "Sand", "m³", 0.045, 35.00),
    rate(MaterialGroup::Structure, "Aggregate", "m³", 0.09, 40.00),
    rate(MaterialGroup::Structure, "Bricks", "piece", 55.0, 0.45),
    rate(MaterialGroup::Finishing, "Ceramic tiles", "m²", 1.10, 18.00),
    rate(MaterialGroup::Finishing, "Paint", "liter", 0.35, 6.50),
    rate(MaterialGroup::Finishing, "Plaster", "bag", 0.25, 7.00),
    rate(MaterialGroup::Finishing, "Doors and windows", "unit", 0.04, 220.00),
    rate(MaterialGroup::Services, "Electrical wiring", "m", 3.50, 1.20),
    rate(MaterialGroup::Services, "Plumbing pipes", "m", 1.20, 4.50),
    rate(MaterialGroup::Services, "Sanitary fixtures", "unit", 0.05, 150.00),
];

const GROUP_ORDER: [MaterialGroup; 3] = [
    MaterialGroup::Structure,
    MaterialGroup::Finishing,
    MaterialGroup::Services,
];

pub fn category_multiplier(category: ProjectCategory) -> f64 {
    match category {
        ProjectCategory::Residential => 1.00,
        ProjectCategory::Commercial => 1.25,
        ProjectCategory::Industrial => 1.40,
    }
}

pub fn quality_multiplier(quality: QualityLevel) -> f64 {
    match quality {
        QualityLevel::Basic => 0.85,
        QualityLevel::Standard => 1.00,
        QualityLevel::Premium => 1.35,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn validate_wastage(wastage_percent: f64) -> Result<f64, EstimationError> {
    if !wastage_percent.is_finite() || !(0.0..=MAX_WASTAGE_PERCENT).contains(&wastage_percent) {
        return Err(EstimationError::Validation(format!(
            "wastage_percent must be between 0 and {MAX_WASTAGE_PERCENT}"
        )));
    }
    Ok(wastage_percent)
}

/// Compute an estimation. `catalog_prices` maps lowercase material names to catalog prices,
/// which take precedence over the built-in default rates.
pub fn calculate(
    request: &EstimationRequest,
    catalog_prices: &HashMap<String, f64>,
) -> Result<EstimationResult, EstimationError> {
    let area = request.area_sqm;
    if !area.is_finite() || area <= 0.0 {
        return Err(EstimationError::Validation(
            "area_sqm must be a positive number".to_string(),
        ));
    }
    let wastage_percent =
        validate_wastage(request.wastage_percent.unwrap_or(DEFAULT_WASTAGE_PERCENT))?;

    let category_multiplier = category_multiplier(request.category);
    let quality_multiplier = quality_multiplier(request.quality);
    let wastage_factor = 1.0 + wastage_percent / 100.0;

    let categories: Vec<CategoryEstimate> = GROUP_ORDER
        .iter()
        .map(|group| {
            let items: Vec<EstimationLineItem> = MATERIAL_RATES
                .iter()
                .filter(|rate| rate.group == *group)
                .map(|rate| {
                    let (unit_price, price_source) =
                        match catalog_prices.get(&rate.material.to_lowercase()) {
                            Some(price) => (*price, PriceSource::Catalog),
                            None => (rate.default_price, PriceSource::Default),
                        };
                    let base_quantity = area * rate.quantity_per_sqm;
                    EstimationLineItem {
                        material: rate.material.to_string(),
                        unit: rate.unit.to_string(),
                        quantity: round2(base_quantity * wastage_factor),
                        unit_price,
                        price_source,
                        cost: round2(
                            base_quantity
                                * unit_price
                                * category_multiplier
                                * quality_multiplier
                                * wastage_factor,
                        ),
                    }
                })
                .collect();
            let total = round2(items.iter().map(|item| item.cost).sum());
            CategoryEstimate {
                group: *group,
                items,
                total,
            }
        })
        .collect();

    let total_cost: f64 = categories.iter().map(|c| c.total).sum();
    let cost_per_sqm = round2(total_cost / area);

    let all_finite = [total_cost, cost_per_sqm]
        .into_iter()
        .chain(
            categories
                .iter()
                .flat_map(|c| c.items.iter().flat_map(|item| [item.quantity, item.cost])),
        )
        .all(f64::is_finite);
    if !all_finite {
        return Err(EstimationError::Validation(
            "area_sqm is too large to estimate".to_string(),
        ));
    }

    Ok(EstimationResult {
        area_sqm: area,
        category: request.category,
        quality: request.quality,
        wastage_percent,
        category_multiplier,
        quality_multiplier,
        wastage_factor,
        cost_per_sqm,
        categories,
        total_cost,
    })
}

pub struct EstimationService;

impl EstimationService {
    async fn catalog_prices(pool: &SqlitePool) -> Result<HashMap<String, f64>, sqlx::Error> {
        Ok(Material::find_all(pool, None)
            .await?
            .into_iter()
            .map(|m| (m.name.to_lowercase(), m.current_price))
            .collect())
    }

    /// Calculate without persisting
    pub async fn calculate(
        pool: &SqlitePool,
        request: &EstimationRequest,
    ) -> Result<EstimationResult, EstimationError> {
        let prices = Self::catalog_prices(pool).await?;
        calculate(request, &prices)
    }

    pub async fn save_project_estimation(
        pool: &SqlitePool,
        project_id: Uuid,
        request: &EstimationRequest,
    ) -> Result<ProjectEstimation, EstimationError> {
        Project::find_by_id(pool, project_id)
            .await?
            .ok_or(EstimationError::ProjectNotFound)?;

        let result = Self::calculate(pool, request).await?;
        let estimation = ProjectEstimation::create(pool, project_id, &result, Uuid::new_v4()).await?;

        ActivityLog::create(
            pool,
            Some(project_id),
            EntityType::Estimation,
            estimation.id,
            ActivityAction::Created,
            Some(format!(
                "{:.2} m² {} / {}: {:.2}",
                result.area_sqm, result.category, result.quality, result.total_cost
            )),
        )
        .await?;

        info!(
            project_id = %project_id,
            estimation_id = %estimation.id,
            total_cost = result.total_cost,
            "Saved project estimation"
        );
        Ok(estimation)
    }

    pub async fn list_project_estimations(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<ProjectEstimation>, EstimationError> {
        Project::find_by_id(pool, project_id)
            .await?
            .ok_or(EstimationError::ProjectNotFound)?;
        Ok(ProjectEstimation::find_by_project_id(pool, project_id).await?)
    }

    pub async fn get_estimation(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<ProjectEstimation, EstimationError> {
        ProjectEstimation::find_by_id(pool, id)
            .await?
            .ok_or(EstimationError::EstimationNotFound)
    }

    pub async fn delete_estimation(pool: &SqlitePool, id: Uuid) -> Result<(), EstimationError> {
        let estimation = Self::get_estimation(pool, id).await?;
        ProjectEstimation::delete(pool, id).await?;
        ActivityLog::create(
            pool,
            Some(estimation.project_id),
            EntityType::Estimation,
            id,
            ActivityAction::Deleted,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn list_presets(pool: &SqlitePool) -> Result<Vec<EstimationPreset>, EstimationError> {
        Ok(EstimationPreset::find_all(pool).await?)
    }

    pub async fn create_preset(
        pool: &SqlitePool,
        data: &CreateEstimationPreset,
    ) -> Result<EstimationPreset, EstimationError> {
        if data.name.trim().is_empty() {
            return Err(EstimationError::Validation(
                "preset name is required".to_string(),
            ));
        }
        let wastage = validate_wastage(data.wastage_percent.unwrap_or(DEFAULT_WASTAGE_PERCENT))?;

        EstimationPreset::create(pool, data, wastage, Uuid::new_v4())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    EstimationError::Validation(format!(
                        "a preset named '{}' already exists",
                        data.name.trim()
                    ))
                }
                e => e.into(),
            })
    }

    pub async fn delete_preset(pool: &SqlitePool, id: Uuid) -> Result<(), EstimationError> {
        match EstimationPreset::delete(pool, id).await? {
            0 => Err(EstimationError::PresetNotFound),
            _ => Ok(()),
        }
    }

    /// Calculate using a saved preset's parameters for the given area
    pub async fn apply_preset(
        pool: &SqlitePool,
        id: Uuid,
        area_sqm: f64,
    ) -> Result<EstimationResult, EstimationError> {
        let preset = EstimationPreset::find_by_id(pool, id)
            .await?
            .ok_or(EstimationError::PresetNotFound)?;
        Self::calculate(pool, &preset.to_request(area_sqm)).await
    }
}
