use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::notification::Notification;
use serde::{Deserialize, Serialize};
use services::services::notification::NotificationService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::Query};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub unread_only: bool,
}

/// Whose read state to change; without a user the shared flag is set
#[derive(Debug, Deserialize)]
pub struct ReaderQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ReadAllResponse {
    pub updated: u64,
}

pub async fn list_notifications(
    State(deployment): State<Deployment>,
    Query(query): Query<NotificationQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Notification>>>, ApiError> {
    let notifications =
        NotificationService::list(&deployment.db().pool, query.user_id, query.unread_only).await?;
    Ok(ResponseJson(ApiResponse::success(notifications)))
}

pub async fn mark_read(
    State(deployment): State<Deployment>,
    Path(notification_id): Path<Uuid>,
    Query(query): Query<ReaderQuery>,
) -> Result<ResponseJson<ApiResponse<Notification>>, ApiError> {
    let notification =
        NotificationService::mark_read(&deployment.db().pool, notification_id, query.user_id)
            .await?;
    Ok(ResponseJson(ApiResponse::success(notification)))
}

pub async fn mark_all_read(
    State(deployment): State<Deployment>,
    Query(query): Query<ReaderQuery>,
) -> Result<ResponseJson<ApiResponse<ReadAllResponse>>, ApiError> {
    let updated = NotificationService::mark_all_read(&deployment.db().pool, query.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(ReadAllResponse { updated })))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{notification_id}/read", post(mark_read))
}
