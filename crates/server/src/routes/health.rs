use axum::response::Json as ResponseJson;
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

#[derive(Debug, Serialize, TS)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> ResponseJson<ApiResponse<HealthStatus>> {
    ResponseJson(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
