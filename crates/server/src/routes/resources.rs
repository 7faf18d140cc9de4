use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::resource::{CreateResource, Resource, ResourceType, UpdateResource};
use serde::Deserialize;
use services::services::project::ProjectService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::{Json, Query}};

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    pub resource_type: Option<ResourceType>,
}

pub async fn list_resources(
    State(deployment): State<Deployment>,
    Query(query): Query<ResourceQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Resource>>>, ApiError> {
    let resources =
        ProjectService::list_resources(&deployment.db().pool, query.resource_type).await?;
    Ok(ResponseJson(ApiResponse::success(resources)))
}

pub async fn get_resource(
    State(deployment): State<Deployment>,
    Path(resource_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Resource>>, ApiError> {
    let resource = ProjectService::get_resource(&deployment.db().pool, resource_id).await?;
    Ok(ResponseJson(ApiResponse::success(resource)))
}

pub async fn create_resource(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateResource>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Resource>>), ApiError> {
    let resource = ProjectService::create_resource(&deployment.db().pool, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(resource))))
}

pub async fn update_resource(
    State(deployment): State<Deployment>,
    Path(resource_id): Path<Uuid>,
    Json(payload): Json<UpdateResource>,
) -> Result<ResponseJson<ApiResponse<Resource>>, ApiError> {
    let resource =
        ProjectService::update_resource(&deployment.db().pool, resource_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(resource)))
}

pub async fn delete_resource(
    State(deployment): State<Deployment>,
    Path(resource_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ProjectService::delete_resource(&deployment.db().pool, resource_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/resources", get(list_resources).post(create_resource))
        .route(
            "/resources/{resource_id}",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
}
