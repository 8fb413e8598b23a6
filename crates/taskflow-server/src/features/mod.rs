//! Feature modules implementing the Taskflow API
//!
//! Each feature is a vertical slice following the CQRS pattern:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//!
//! # Features
//!
//! - **tasks**: task CRUD
//! - **uploads**: batch uploads handed to the ingestion pipeline

pub mod shared;
pub mod tasks;
pub mod uploads;

use axum::Router;

pub use uploads::UploadState;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub db: sqlx::PgPool,
    pub uploads: UploadState,
}

/// Creates the API router with every feature mounted under its own prefix
///
/// - `/tasks` - Task CRUD
/// - `/uploads` - Batch uploads
pub fn router(state: FeatureState) -> Router<()> {
    let max_upload_bytes = state.uploads.max_upload_bytes;

    Router::new()
        .nest("/tasks", tasks::tasks_routes().with_state(state.db))
        .nest(
            "/uploads",
            uploads::uploads_routes(max_upload_bytes).with_state(state.uploads),
        )
}
