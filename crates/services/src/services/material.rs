use db::models::{
    activity_log::{ActivityAction, ActivityLog, EntityType},
    market::{CreateRealEstateMarket, MarketFilter, RealEstateMarket},
    material::{CreateMaterial, Material, MaterialPriceHistory, UpdateMaterial},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MaterialServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("material not found")]
    MaterialNotFound,
    #[error("market data not found")]
    MarketNotFound,
}

fn check_material(name: &str, unit: &str, price: f64) -> Result<(), MaterialServiceError> {
    if name.trim().is_empty() {
        return Err(MaterialServiceError::Validation(
            "material name is required".to_string(),
        ));
    }
    if unit.trim().is_empty() {
        return Err(MaterialServiceError::Validation(
            "material unit is required".to_string(),
        ));
    }
    if !(price >= 0.0) || !price.is_finite() {
        return Err(MaterialServiceError::Validation(
            "current_price must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

fn unique_name(name: &str) -> impl FnOnce(sqlx::Error) -> MaterialServiceError + '_ {
    move |e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => MaterialServiceError::Validation(
            format!("a material named '{}' already exists", name.trim()),
        ),
        e => e.into(),
    }
}

/// Material catalog, price history and real-estate market data
pub struct MaterialService;

impl MaterialService {
    pub async fn list_materials(
        pool: &SqlitePool,
        category: Option<&str>,
    ) -> Result<Vec<Material>, MaterialServiceError> {
        Ok(Material::find_all(pool, category).await?)
    }

    pub async fn get_material(pool: &SqlitePool, id: Uuid) -> Result<Material, MaterialServiceError> {
        Material::find_by_id(pool, id)
            .await?
            .ok_or(MaterialServiceError::MaterialNotFound)
    }

    pub async fn create_material(
        pool: &SqlitePool,
        data: &CreateMaterial,
    ) -> Result<Material, MaterialServiceError> {
        check_material(&data.name, &data.unit, data.current_price)?;

        let mut tx = pool.begin().await?;
        let material = Material::create(&mut *tx, data, Uuid::new_v4())
            .await
            .map_err(unique_name(&data.name))?;
        MaterialPriceHistory::record(&mut *tx, material.id, material.current_price).await?;
        ActivityLog::create(
            &mut *tx,
            None,
            EntityType::Material,
            material.id,
            ActivityAction::Created,
            Some(material.name.clone()),
        )
        .await?;
        tx.commit().await?;
        Ok(material)
    }

    /// Apply a partial update; a price change is appended to the material's price history
    pub async fn update_material(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateMaterial,
    ) -> Result<Material, MaterialServiceError> {
        let existing = Self::get_material(pool, id).await?;
        let old_price = existing.current_price;

        let mut material = existing;
        if let Some(name) = &data.name {
            material.name = name.trim().to_string();
        }
        if let Some(category) = &data.category {
            material.category = category.clone();
        }
        if let Some(unit) = &data.unit {
            material.unit = unit.clone();
        }
        if let Some(price) = data.current_price {
            material.current_price = price;
        }
        if let Some(supplier) = &data.supplier {
            material.supplier = Some(supplier.clone());
        }
        check_material(&material.name, &material.unit, material.current_price)?;

        let mut tx = pool.begin().await?;
        let material = Material::update(&mut *tx, &material)
            .await
            .map_err(unique_name(&material.name))?;

        if material.current_price != old_price {
            MaterialPriceHistory::record(&mut *tx, id, material.current_price).await?;
            ActivityLog::create(
                &mut *tx,
                None,
                EntityType::Material,
                id,
                ActivityAction::PriceChanged,
                Some(format!("{old_price:.2} -> {:.2}", material.current_price)),
            )
            .await?;
            info!(
                material_id = %id,
                old_price,
                new_price = material.current_price,
                "Material price changed"
            );
        } else {
            ActivityLog::create(
                &mut *tx,
                None,
                EntityType::Material,
                id,
                ActivityAction::Updated,
                None,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(material)
    }

    pub async fn delete_material(pool: &SqlitePool, id: Uuid) -> Result<(), MaterialServiceError> {
        let material = Self::get_material(pool, id).await?;
        let mut tx = pool.begin().await?;
        Material::delete(&mut *tx, id).await?;
        ActivityLog::create(
            &mut *tx,
            None,
            EntityType::Material,
            id,
            ActivityAction::Deleted,
            Some(material.name),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn price_history(
        pool: &SqlitePool,
        material_id: Uuid,
    ) -> Result<Vec<MaterialPriceHistory>, MaterialServiceError> {
        Self::get_material(pool, material_id).await?;
        Ok(MaterialPriceHistory::find_by_material_id(pool, material_id).await?)
    }

    // Market data

    pub async fn list_market_data(
        pool: &SqlitePool,
        filter: &MarketFilter,
    ) -> Result<Vec<RealEstateMarket>, MaterialServiceError> {
        Ok(RealEstateMarket::find(pool, filter).await?)
    }

    pub async fn get_market_data(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<RealEstateMarket, MaterialServiceError> {
        RealEstateMarket::find_by_id(pool, id)
            .await?
            .ok_or(MaterialServiceError::MarketNotFound)
    }

    pub async fn create_market_data(
        pool: &SqlitePool,
        data: &CreateRealEstateMarket,
    ) -> Result<RealEstateMarket, MaterialServiceError> {
        if data.region.trim().is_empty() || data.city.trim().is_empty() {
            return Err(MaterialServiceError::Validation(
                "region and city are required".to_string(),
            ));
        }
        if !(data.avg_price_per_sqm > 0.0) || !data.avg_price_per_sqm.is_finite() {
            return Err(MaterialServiceError::Validation(
                "avg_price_per_sqm must be positive".to_string(),
            ));
        }
        if data.avg_rent_per_sqm.is_some_and(|rent| !(rent >= 0.0)) {
            return Err(MaterialServiceError::Validation(
                "avg_rent_per_sqm must not be negative".to_string(),
            ));
        }
        Ok(RealEstateMarket::create(pool, data, Uuid::new_v4()).await?)
    }
}
