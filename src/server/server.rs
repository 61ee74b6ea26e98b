use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

use super::analysis_routes::make_analysis_routes;
use super::library_routes::make_library_routes;
use super::metrics::metrics_handler;
use super::{log_requests, state::*, ServerConfig};
use crate::analysis::SongAnalyzer;
use crate::library::LibraryStore;

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    message: &'static str,
    uptime: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok",
        message: "Tabgeni backend is running",
        uptime: format_uptime(state.start_time.elapsed()),
    })
}

pub fn make_app(
    config: ServerConfig,
    analyzer: Arc<SongAnalyzer>,
    library_store: Arc<dyn LibraryStore>,
) -> Result<Router> {
    let uploads_root = analyzer.uploads().root().to_path_buf();
    let state = ServerState::new(config, analyzer, library_store);

    let home_router: Router = Router::new()
        .route("/health", get(health))
        .with_state(state.clone());

    let app: Router = home_router
        .merge(make_analysis_routes(state.clone()))
        .nest("/library", make_library_routes(state.clone()))
        .nest_service("/uploads", ServeDir::new(uploads_root))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(CorsLayer::permissive());

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    metrics_port: u16,
    analyzer: Arc<SongAnalyzer>,
    library_store: Arc<dyn LibraryStore>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, analyzer, library_store)?;

    let metrics_listener = TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", err);
        }
    });
    info!("Metrics available at port {}!", metrics_port);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Ready to serve at port {}!", port);

    Ok(axum::serve(listener, app).await?)
}
