use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::estimation::{
    CreateEstimationPreset, EstimationPreset, EstimationRequest, EstimationResult,
    ProjectEstimation, ProjectEstimationWithBreakdown,
};
use serde::{Deserialize, Serialize};
use services::services::estimation::EstimationService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::Json};

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ApplyPresetRequest {
    pub area_sqm: f64,
}

/// POST /api/estimation/calculate
pub async fn calculate(
    State(deployment): State<Deployment>,
    Json(payload): Json<EstimationRequest>,
) -> Result<ResponseJson<ApiResponse<EstimationResult>>, ApiError> {
    let result = EstimationService::calculate(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub async fn list_presets(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<EstimationPreset>>>, ApiError> {
    let presets = EstimationService::list_presets(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(presets)))
}

pub async fn create_preset(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateEstimationPreset>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<EstimationPreset>>), ApiError> {
    let preset = EstimationService::create_preset(&deployment.db().pool, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(preset))))
}

pub async fn delete_preset(
    State(deployment): State<Deployment>,
    Path(preset_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    EstimationService::delete_preset(&deployment.db().pool, preset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn apply_preset(
    State(deployment): State<Deployment>,
    Path(preset_id): Path<Uuid>,
    Json(payload): Json<ApplyPresetRequest>,
) -> Result<ResponseJson<ApiResponse<EstimationResult>>, ApiError> {
    let result =
        EstimationService::apply_preset(&deployment.db().pool, preset_id, payload.area_sqm)
            .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub async fn list_project_estimations(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectEstimation>>>, ApiError> {
    let estimations =
        EstimationService::list_project_estimations(&deployment.db().pool, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(estimations)))
}

/// POST /api/estimation/projects/{project_id}
pub async fn save_project_estimation(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<EstimationRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ProjectEstimationWithBreakdown>>), ApiError> {
    let estimation =
        EstimationService::save_project_estimation(&deployment.db().pool, project_id, &payload)
            .await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(estimation.with_breakdown())),
    ))
}

pub async fn get_estimation(
    State(deployment): State<Deployment>,
    Path(estimation_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProjectEstimationWithBreakdown>>, ApiError> {
    let estimation =
        EstimationService::get_estimation(&deployment.db().pool, estimation_id).await?;
    Ok(ResponseJson(ApiResponse::success(estimation.with_breakdown())))
}

pub async fn delete_estimation(
    State(deployment): State<Deployment>,
    Path(estimation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    EstimationService::delete_estimation(&deployment.db().pool, estimation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/estimation",
        Router::new()
            .route("/calculate", post(calculate))
            .route("/presets", get(list_presets).post(create_preset))
            .route("/presets/{preset_id}", delete(delete_preset))
            .route("/presets/{preset_id}/apply", post(apply_preset))
            .route(
                "/projects/{project_id}",
                get(list_project_estimations).post(save_project_estimation),
            )
            .route(
                "/{estimation_id}",
                get(get_estimation).delete(delete_estimation),
            ),
    )
}
