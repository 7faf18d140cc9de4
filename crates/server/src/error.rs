use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{
    ai::AiServiceError, estimation::EstimationError, material::MaterialServiceError,
    notification::NotificationError, project::ProjectServiceError, report::ReportError,
    user::UserServiceError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Project(#[from] ProjectServiceError),
    #[error(transparent)]
    Estimation(#[from] EstimationError),
    #[error(transparent)]
    Material(#[from] MaterialServiceError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Ai(#[from] AiServiceError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    User(#[from] UserServiceError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error(transparent)]
    Query(#[from] QueryRejection),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Project(err) => match err {
                ProjectServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ProjectServiceError::ProjectNotFound
                | ProjectServiceError::TaskNotFound
                | ProjectServiceError::ResourceNotFound
                | ProjectServiceError::AssignmentNotFound => StatusCode::NOT_FOUND,
                ProjectServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Estimation(err) => match err {
                EstimationError::Validation(_) => StatusCode::BAD_REQUEST,
                EstimationError::ProjectNotFound
                | EstimationError::EstimationNotFound
                | EstimationError::PresetNotFound => StatusCode::NOT_FOUND,
                EstimationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Material(err) => match err {
                MaterialServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                MaterialServiceError::MaterialNotFound | MaterialServiceError::MarketNotFound => {
                    StatusCode::NOT_FOUND
                }
                MaterialServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Report(err) => match err {
                ReportError::ProjectNotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Ai(err) => match err {
                AiServiceError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                AiServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                AiServiceError::ProjectNotFound | AiServiceError::NoMarketData => {
                    StatusCode::NOT_FOUND
                }
                AiServiceError::Llm(_) | AiServiceError::Database(_) | AiServiceError::Serde(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Notification(err) => match err {
                NotificationError::NotFound | NotificationError::UserNotFound => {
                    StatusCode::NOT_FOUND
                }
                NotificationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::User(err) => match err {
                UserServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                UserServiceError::NotFound => StatusCode::NOT_FOUND,
                UserServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Json(_) | ApiError::Query(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        let message = if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %detail, "Request failed");
            match &self {
                ApiError::Ai(AiServiceError::NotConfigured) => "AI service unavailable",
                ApiError::Ai(AiServiceError::Llm(_)) => "AI provider request failed",
                _ => "Internal server error",
            }
        } else {
            tracing::debug!(status = status.as_u16(), error = %detail, "Request rejected");
            detail.as_str()
        };

        let body = ApiResponse::<()>::error_with_detail(message, detail.clone());
        (status, ResponseJson(body)).into_response()
    }
}
