use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::material::{CreateMaterial, Material, MaterialPriceHistory, UpdateMaterial};
use serde::Deserialize;
use services::services::material::MaterialService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::{Json, Query}};

#[derive(Debug, Deserialize)]
pub struct MaterialQuery {
    pub category: Option<String>,
}

pub async fn list_materials(
    State(deployment): State<Deployment>,
    Query(query): Query<MaterialQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Material>>>, ApiError> {
    let materials =
        MaterialService::list_materials(&deployment.db().pool, query.category.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(materials)))
}

pub async fn get_material(
    State(deployment): State<Deployment>,
    Path(material_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Material>>, ApiError> {
    let material = MaterialService::get_material(&deployment.db().pool, material_id).await?;
    Ok(ResponseJson(ApiResponse::success(material)))
}

pub async fn create_material(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateMaterial>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Material>>), ApiError> {
    let material = MaterialService::create_material(&deployment.db().pool, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(material))))
}

pub async fn update_material(
    State(deployment): State<Deployment>,
    Path(material_id): Path<Uuid>,
    Json(payload): Json<UpdateMaterial>,
) -> Result<ResponseJson<ApiResponse<Material>>, ApiError> {
    let material =
        MaterialService::update_material(&deployment.db().pool, material_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(material)))
}

pub async fn delete_material(
    State(deployment): State<Deployment>,
    Path(material_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    MaterialService::delete_material(&deployment.db().pool, material_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/materials/{material_id}/price-history
pub async fn price_history(
    State(deployment): State<Deployment>,
    Path(material_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<MaterialPriceHistory>>>, ApiError> {
    let history = MaterialService::price_history(&deployment.db().pool, material_id).await?;
    Ok(ResponseJson(ApiResponse::success(history)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/materials", get(list_materials).post(create_material))
        .route(
            "/materials/{material_id}",
            get(get_material).put(update_material).delete(delete_material),
        )
        .route("/materials/{material_id}/price-history", get(price_history))
}
