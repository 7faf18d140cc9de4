use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use services::services::report::{ExportedReport, MaterialsReport, ProjectReport, ReportFormat};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::Json};

#[derive(Debug, Default, Serialize, Deserialize, TS)]
pub struct ExportReportRequest {
    #[serde(default)]
    pub format: ReportFormat,
}

pub async fn project_report(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProjectReport>>, ApiError> {
    let report = deployment
        .reports()
        .project_report(&deployment.db().pool, project_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// POST /api/reports/projects/{project_id}/export
pub async fn export_project_report(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<ExportReportRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ExportedReport>>), ApiError> {
    let exported = deployment
        .reports()
        .export_project_report(&deployment.db().pool, project_id, payload.format)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(exported))))
}

pub async fn materials_report(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<MaterialsReport>>, ApiError> {
    let report = deployment
        .reports()
        .materials_report(&deployment.db().pool)
        .await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/reports",
        Router::new()
            .route("/projects/{project_id}", get(project_report))
            .route("/projects/{project_id}/export", post(export_project_report))
            .route("/materials", get(materials_report)),
    )
}
