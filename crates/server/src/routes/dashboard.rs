use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use services::services::project::{DashboardStats, ProjectService};
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError};

/// GET /api/dashboard/stats
pub async fn get_stats(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<DashboardStats>>, ApiError> {
    let stats = ProjectService::dashboard_stats(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/dashboard/stats", get(get_stats))
}
