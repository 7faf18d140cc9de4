use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::user::{CreateUser, User};
use services::services::user::UserService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::Json};

pub async fn list_users(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    let users = UserService::list(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn get_user(
    State(deployment): State<Deployment>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = UserService::get(&deployment.db().pool, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn create_user(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateUser>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<User>>), ApiError> {
    let user = UserService::create(&deployment.db().pool, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(user))))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{user_id}", get(get_user))
}
