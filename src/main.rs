use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

mod catalog;
mod config;
mod handlers;
mod llm;
mod matcher;
mod pipeline;
mod state;
mod utils;

use config::CONFIG;
use llm::AnalysisClient;
use pipeline::Pipeline;
use state::AppState;
use utils::logging::init_logging;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _logging_guards = init_logging();

    let config = &*CONFIG;
    info!(
        "Starting interior advisor (model={}, mode={:?})",
        config.gemini_model, config.recommendation_mode
    );

    let client = AnalysisClient::from_config(config);
    let pipeline = Pipeline::new(client, config.recommendation_mode);
    let state = AppState::new(pipeline, config.result_ttl_seconds);

    let app = Router::new()
        .route("/", get(handlers::recommend::index))
        .route("/api/recommend", post(handlers::recommend::ai_recommend))
        .route(
            "/api/recommendation/:id",
            get(handlers::recommend::recommendation_detail),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on {}", config.bind_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
