use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::market::{CreateRealEstateMarket, MarketFilter, RealEstateMarket};
use services::services::material::MaterialService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::{Json, Query}};

pub async fn list_market_data(
    State(deployment): State<Deployment>,
    Query(filter): Query<MarketFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<RealEstateMarket>>>, ApiError> {
    let rows = MaterialService::list_market_data(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn get_market_data(
    State(deployment): State<Deployment>,
    Path(market_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<RealEstateMarket>>, ApiError> {
    let row = MaterialService::get_market_data(&deployment.db().pool, market_id).await?;
    Ok(ResponseJson(ApiResponse::success(row)))
}

pub async fn create_market_data(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateRealEstateMarket>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<RealEstateMarket>>), ApiError> {
    let row = MaterialService::create_market_data(&deployment.db().pool, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(row))))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/market", get(list_market_data).post(create_market_data))
        .route("/market/{market_id}", get(get_market_data))
}
