use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use db::DBService;
use serde_json::{Value, json};
use server::{Deployment, routes};
use services::services::{
    ai::AiService,
    config::ProviderKind,
    llm::{LlmError, LlmMessage, LlmProvider},
    report::ReportService,
};
use tower::ServiceExt;

struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-1"
    }

    async fn complete(
        &self,
        _system: Option<&str>,
        messages: &[LlmMessage],
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(format!("You said: {last}"))
    }
}

async fn app_with_ai(ai: AiService) -> Router {
    let db = DBService::new_in_memory().await.unwrap();
    let reports = ReportService::new(std::env::temp_dir().join("housy-api-tests"));
    routes::router(Deployment::new(db, ai, reports))
}

async fn app() -> Router {
    app_with_ai(AiService::new(None, vec![])).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_project(app: &Router, name: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/projects",
        Some(json!({ "name": name, "category": "commercial", "budget": 500000.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

#[tokio::test]
async fn health_check_reports_ok() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn project_round_trip_and_errors() {
    let app = app().await;
    let project = create_project(&app, "Riverside Lofts").await;
    let id = project["id"].as_str().unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/api/projects/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Riverside Lofts");
    assert_eq!(body["data"]["category"], "commercial");
    assert_eq!(body["data"]["status"], "planning");
    assert_eq!(body["data"]["budget"], 500000.0);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/projects/00000000-0000-4000-8000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "project not found");

    let (status, body) = send(&app, Method::POST, "/api/projects", Some(json!({ "name": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, Method::GET, "/api/projects?status=planning", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/projects/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/projects",
        Some(json!({ "description": "no name" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/projects",
        Some(json!({ "name": "Tower", "category": "castle" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, Method::GET, "/api/projects?status=sleeping", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/estimation/calculate",
        Some(json!({ "area_sqm": 1e307 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn task_lifecycle_updates_progress_and_activity() {
    let app = app().await;
    let project = create_project(&app, "Canal House").await;
    let project_id = project["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "project_id": project_id, "title": "Pour foundations", "progress": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/tasks/{task_id}/status"),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["progress"], 100);

    let (_, body) = send(&app, Method::GET, &format!("/api/projects/{project_id}"), None).await;
    assert_eq!(body["data"]["progress"], 100);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/tasks/{task_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, Method::GET, &format!("/api/projects/{project_id}/tasks"), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/activities?project_id={project_id}"),
        None,
    )
    .await;
    let actions: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["deleted", "status_changed", "created", "created"]);

    let (_, body) = send(&app, Method::GET, "/api/notifications", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = send(&app, Method::POST, "/api/notifications/read-all", None).await;
    assert_eq!(body["data"]["updated"], 1);
}

#[tokio::test]
async fn resource_assignment_endpoints() {
    let app = app().await;
    let project = create_project(&app, "Depot").await;
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "project_id": project["id"], "title": "Lift steel" })),
    )
    .await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/resources",
        Some(json!({ "name": "Mobile crane", "resource_type": "equipment", "cost_per_unit": 150.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let resource_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/tasks/{task_id}/resources"),
        Some(json!({ "resource_id": resource_id, "allocation_percent": 150 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/tasks/{task_id}/resources"),
        Some(json!({ "resource_id": resource_id, "allocation_percent": 75 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["allocation_percent"], 75);

    let uri = format!("/api/tasks/{task_id}/resources/{resource_id}");
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn estimation_total_matches_category_totals() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/estimation/calculate",
        Some(json!({ "area_sqm": 180.0, "category": "industrial", "quality": "premium" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    let sum: f64 = data["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["total"].as_f64().unwrap())
        .sum();
    assert!((data["total_cost"].as_f64().unwrap() - sum).abs() < 1e-6);
    assert_eq!(data["category_multiplier"], 1.4);
    assert_eq!(data["quality_multiplier"], 1.35);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/estimation/calculate",
        Some(json!({ "area_sqm": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let project = create_project(&app, "Warehouse 9").await;
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/estimation/projects/{}", project["id"].as_str().unwrap()),
        Some(json!({ "area_sqm": 1200.0, "category": "industrial" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["breakdown"]["categories"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn ai_endpoints_without_provider_are_unavailable() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/chat",
        Some(json!({ "message": "How much rebar for a 200 m² slab?" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, Method::GET, "/api/ai/providers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["active"].is_null());
}

#[tokio::test]
async fn chat_with_configured_provider() {
    let app = app_with_ai(AiService::new(
        Some(Arc::new(EchoProvider)),
        vec![ProviderKind::Ollama],
    ))
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/chat",
        Some(json!({ "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reply"]["content"], "You said: hello");
    let conversation_id = body["data"]["conversation_id"].as_str().unwrap().to_string();

    let (_, body) = send(&app, Method::GET, &format!("/api/ai/chat/{conversation_id}"), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/api/ai/providers", None).await;
    assert_eq!(body["data"]["active"], "echo");
    assert_eq!(body["data"]["configured"], json!(["ollama"]));
}
