use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, patch, post},
};
use db::models::{
    resource::{AllocatedResource, AssignResource, TaskResource},
    task::{CreateTask, Task, TaskStatus, UpdateTask},
};
use serde::{Deserialize, Serialize};
use services::services::project::ProjectService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::Json};

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateTaskStatus {
    pub status: TaskStatus,
}

pub async fn create_task(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateTask>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    let task = ProjectService::create_task(&deployment.db().pool, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(task))))
}

pub async fn get_task(
    State(deployment): State<Deployment>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = ProjectService::get_task(&deployment.db().pool, task_id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    State(deployment): State<Deployment>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = ProjectService::update_task(&deployment.db().pool, task_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// PATCH /api/tasks/{task_id}/status
pub async fn update_task_status(
    State(deployment): State<Deployment>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskStatus>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task =
        ProjectService::update_task_status(&deployment.db().pool, task_id, payload.status).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(deployment): State<Deployment>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ProjectService::delete_task(&deployment.db().pool, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_task_resources(
    State(deployment): State<Deployment>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<AllocatedResource>>>, ApiError> {
    let resources = ProjectService::list_task_resources(&deployment.db().pool, task_id).await?;
    Ok(ResponseJson(ApiResponse::success(resources)))
}

pub async fn assign_resource(
    State(deployment): State<Deployment>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<AssignResource>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<TaskResource>>), ApiError> {
    let assignment = ProjectService::assign_resource(
        &deployment.db().pool,
        task_id,
        payload.resource_id,
        payload.allocation_percent,
    )
    .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(assignment))))
}

pub async fn unassign_resource(
    State(deployment): State<Deployment>,
    Path((task_id, resource_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    ProjectService::unassign_resource(&deployment.db().pool, task_id, resource_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/tasks", post(create_task))
        .route(
            "/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{task_id}/status", patch(update_task_status))
        .route(
            "/tasks/{task_id}/resources",
            get(list_task_resources).post(assign_resource),
        )
        .route(
            "/tasks/{task_id}/resources/{resource_id}",
            delete(unassign_resource),
        )
}
