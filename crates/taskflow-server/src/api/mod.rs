pub mod response;

use crate::config::CorsConfig;
use crate::db;
use crate::error::AppError;
use crate::features::{self, FeatureState};
use crate::middleware;
use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;

/// Build the full application router with middleware
pub fn create_router(state: FeatureState, cors: &CorsConfig) -> Router {
    let db = state.db.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(db)
        .nest("/api/v1", features::router(state))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Taskflow Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health(State(db): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    db::health_check(&db)
        .await
        .map_err(|e| AppError::Unavailable(format!("database unreachable: {}", e)))?;

    Ok(Json(json!({
        "status": "healthy",
        "database": "connected"
    })))
}
