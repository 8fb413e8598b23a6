//! Task API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/tasks` - Create a task
//! - `GET /api/v1/tasks` - List tasks with pagination and a `completed` filter
//! - `GET /api/v1/tasks/:id` - Get a single task
//! - `PUT /api/v1/tasks/:id` - Partially update a task
//! - `DELETE /api/v1/tasks/:id` - Delete a task

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;

use super::{
    commands::{
        CreateTaskCommand, CreateTaskError, DeleteTaskCommand, DeleteTaskError,
        UpdateTaskCommand, UpdateTaskError,
    },
    queries::{GetTaskError, GetTaskQuery, ListTasksError, ListTasksQuery},
};

// ============================================================================
// Router Configuration
// ============================================================================

pub fn tasks_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// `POST /api/v1/tasks`
///
/// - `201 Created` - Task created
/// - `400 Bad Request` - Validation error
/// - `409 Conflict` - A task with the supplied id already exists
#[tracing::instrument(skip(pool, command), fields(title = %command.title))]
async fn create_task(
    State(pool): State<PgPool>,
    Json(command): Json<CreateTaskCommand>,
) -> Result<Response, TaskApiError> {
    let response = super::commands::create::handle(pool, command).await?;

    tracing::info!(task_id = response.id, "Task created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// `PUT /api/v1/tasks/:id`
#[tracing::instrument(skip(pool, command))]
async fn update_task(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(mut command): Json<UpdateTaskCommand>,
) -> Result<Response, TaskApiError> {
    command.id = id;

    let response = super::commands::update::handle(pool, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// `DELETE /api/v1/tasks/:id`
#[tracing::instrument(skip(pool))]
async fn delete_task(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Response, TaskApiError> {
    let response = super::commands::delete::handle(pool, DeleteTaskCommand { id }).await?;

    tracing::info!(task_id = response.id, "Task deleted via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// `GET /api/v1/tasks/:id`
#[tracing::instrument(skip(pool))]
async fn get_task(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Response, TaskApiError> {
    let response = super::queries::get::handle(pool, GetTaskQuery { id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// `GET /api/v1/tasks?page=1&per_page=20&completed=false`
#[tracing::instrument(
    skip(pool, query),
    fields(page = ?query.page, per_page = ?query.per_page, completed = ?query.completed)
)]
async fn list_tasks(
    State(pool): State<PgPool>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Response, TaskApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Tasks listed via API"
    );

    let meta = json!({
        "pagination": response.pagination
    });

    Ok(
        (StatusCode::OK, Json(ApiResponse::success_with_meta(response.items, meta)))
            .into_response(),
    )
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for task API endpoints
#[derive(Debug)]
enum TaskApiError {
    Create(CreateTaskError),
    Update(UpdateTaskError),
    Delete(DeleteTaskError),
    Get(GetTaskError),
    List(ListTasksError),
}

impl From<CreateTaskError> for TaskApiError {
    fn from(err: CreateTaskError) -> Self {
        Self::Create(err)
    }
}

impl From<UpdateTaskError> for TaskApiError {
    fn from(err: UpdateTaskError) -> Self {
        Self::Update(err)
    }
}

impl From<DeleteTaskError> for TaskApiError {
    fn from(err: DeleteTaskError) -> Self {
        Self::Delete(err)
    }
}

impl From<GetTaskError> for TaskApiError {
    fn from(err: GetTaskError) -> Self {
        Self::Get(err)
    }
}

impl From<ListTasksError> for TaskApiError {
    fn from(err: ListTasksError) -> Self {
        Self::List(err)
    }
}

impl TaskApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Create(CreateTaskError::TitleValidation(_))
            | Self::Create(CreateTaskError::DescriptionValidation(_))
            | Self::Update(UpdateTaskError::NoFieldsToUpdate)
            | Self::Update(UpdateTaskError::TitleValidation(_))
            | Self::Update(UpdateTaskError::DescriptionValidation(_))
            | Self::List(ListTasksError::InvalidPagination(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            },
            Self::Create(CreateTaskError::Duplicate(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Update(UpdateTaskError::NotFound(_))
            | Self::Delete(DeleteTaskError::NotFound(_))
            | Self::Get(GetTaskError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Create(CreateTaskError::Database(_))
            | Self::Update(UpdateTaskError::Database(_))
            | Self::Delete(DeleteTaskError::Database(_))
            | Self::Get(GetTaskError::Database(_))
            | Self::List(ListTasksError::Database(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            },
        }
    }
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Database error in task endpoint: {}", self);
            "A database error occurred".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl std::fmt::Display for TaskApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create(e) => write!(f, "{}", e),
            Self::Update(e) => write!(f, "{}", e),
            Self::Delete(e) => write!(f, "{}", e),
            Self::Get(e) => write!(f, "{}", e),
            Self::List(e) => write!(f, "{}", e),
        }
    }
}
