use anyhow::Context;
use db::DBService;
use server::{Deployment, routes};
use services::services::{config::Config, database_validator::DatabaseValidator};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_LOG_FILTER: &str = "info,server=debug,services=debug,db=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(utils::sentry::sentry_layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_url))?;

    let validation = DatabaseValidator::new(db.pool.clone()).validate().await?;
    if !validation.is_ok() {
        warn!("{}", validation.summary());
    }

    let deployment = Deployment::from_config(db, &config)?;
    let app = routes::router(deployment);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let sentry_enabled = utils::sentry::init_once();
    init_tracing();
    if sentry_enabled {
        info!("Sentry error reporting enabled");
    }

    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        sentry::integrations::anyhow::capture_anyhow(&e);
        return Err(e);
    }
    Ok(())
}
