use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::Deployment;

pub mod activities;
pub mod ai;
pub mod dashboard;
pub mod estimation;
pub mod health;
pub mod market;
pub mod materials;
pub mod notifications;
pub mod projects;
pub mod reports;
pub mod resources;
pub mod tasks;
pub mod users;

pub fn router(deployment: Deployment) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_check))
        .merge(dashboard::router(&deployment))
        .merge(users::router(&deployment))
        .merge(projects::router(&deployment))
        .merge(tasks::router(&deployment))
        .merge(resources::router(&deployment))
        .merge(materials::router(&deployment))
        .merge(market::router(&deployment))
        .merge(estimation::router(&deployment))
        .merge(ai::router(&deployment))
        .merge(reports::router(&deployment))
        .merge(activities::router(&deployment))
        .merge(notifications::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(deployment)
}
