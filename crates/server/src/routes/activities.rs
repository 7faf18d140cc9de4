use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::activity_log::ActivityLog;
use serde::Deserialize;
use services::services::activity::ActivityService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::Query};

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub project_id: Option<Uuid>,
    pub limit: Option<i64>,
}

pub async fn list_activities(
    State(deployment): State<Deployment>,
    Query(query): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ActivityLog>>>, ApiError> {
    let activities =
        ActivityService::list(&deployment.db().pool, query.project_id, query.limit).await?;
    Ok(ResponseJson(ApiResponse::success(activities)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/activities", get(list_activities))
}
