use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::chat_message::ChatMessage;
use serde::Deserialize;
use services::services::ai::{
    AiAnalysisView, AiService, ChatRequest, ChatResponse, MarketAnalysis, MarketAnalysisRequest,
    ProjectAnalysis, ProvidersInfo,
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::{Json, Query}};

#[derive(Debug, Deserialize)]
pub struct AnalysesQuery {
    pub project_id: Option<Uuid>,
}

/// POST /api/ai/chat
pub async fn chat(
    State(deployment): State<Deployment>,
    Json(payload): Json<ChatRequest>,
) -> Result<ResponseJson<ApiResponse<ChatResponse>>, ApiError> {
    let response = deployment.ai().chat(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(response)))
}

pub async fn chat_history(
    State(deployment): State<Deployment>,
    Path(conversation_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ChatMessage>>>, ApiError> {
    let messages = AiService::chat_history(&deployment.db().pool, conversation_id).await?;
    Ok(ResponseJson(ApiResponse::success(messages)))
}

pub async fn clear_chat(
    State(deployment): State<Deployment>,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    AiService::clear_chat(&deployment.db().pool, conversation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/ai/market-analysis
pub async fn market_analysis(
    State(deployment): State<Deployment>,
    Json(payload): Json<MarketAnalysisRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<MarketAnalysis>>), ApiError> {
    let analysis = deployment
        .ai()
        .market_analysis(&deployment.db().pool, &payload)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(analysis))))
}

/// POST /api/ai/projects/{project_id}/analysis
pub async fn project_analysis(
    State(deployment): State<Deployment>,
    Path(project_id): Path<Uuid>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ProjectAnalysis>>), ApiError> {
    let analysis = deployment
        .ai()
        .project_analysis(&deployment.db().pool, project_id)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(analysis))))
}

pub async fn list_analyses(
    State(deployment): State<Deployment>,
    Query(query): Query<AnalysesQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AiAnalysisView>>>, ApiError> {
    let analyses = AiService::list_analyses(&deployment.db().pool, query.project_id).await?;
    Ok(ResponseJson(ApiResponse::success(analyses)))
}

pub async fn providers(
    State(deployment): State<Deployment>,
) -> ResponseJson<ApiResponse<ProvidersInfo>> {
    ResponseJson(ApiResponse::success(deployment.ai().providers()))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/ai",
        Router::new()
            .route("/chat", post(chat))
            .route("/chat/{conversation_id}", get(chat_history).delete(clear_chat))
            .route("/market-analysis", post(market_analysis))
            .route("/projects/{project_id}/analysis", post(project_analysis))
            .route("/analyses", get(list_analyses))
            .route("/providers", get(providers)),
    )
}
