use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    project::{CreateProject, Project, ProjectStatus, UpdateProject},
    task::Task,
};
use serde::Deserialize;
use services::services::project::ProjectService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::{Json, Query}};

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
}

pub async fn list_projects(
    State(deployment): State<Deployment>,
    Query(query): Query<ProjectQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = ProjectService::list_projects(&deployment.db().pool, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_project(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = ProjectService::get_project(&deployment.db().pool, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn create_project(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateProject>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Project>>), ApiError> {
    let project = ProjectService::create_project(&deployment.db().pool, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(project))))
}

pub async fn update_project(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project =
        ProjectService::update_project(&deployment.db().pool, project_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ProjectService::delete_project(&deployment.db().pool, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/projects/{project_id}/tasks
pub async fn list_project_tasks(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = ProjectService::list_tasks(&deployment.db().pool, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{project_id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/{project_id}/tasks", get(list_project_tasks))
}
