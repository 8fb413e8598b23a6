use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::pagination::{PaginationMetadata, PaginationParams};
use crate::features::tasks::types::TaskResponse;
use crate::models::{TaskRecord, TASK_COLUMNS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTasksQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTasksResponse {
    pub items: Vec<TaskResponse>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ListTasksError {
    #[error("{0}")]
    InvalidPagination(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListTasksResponse, ListTasksError>> for ListTasksQuery {}

impl crate::cqrs::middleware::Query for ListTasksQuery {}

impl ListTasksQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }

    pub fn validate(&self) -> Result<(), ListTasksError> {
        self.pagination()
            .validate()
            .map_err(ListTasksError::InvalidPagination)
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListTasksQuery,
) -> Result<ListTasksResponse, ListTasksError> {
    query.validate()?;
    let params = query.pagination();

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE ($1::BOOLEAN IS NULL OR completed = $1)",
    )
    .bind(query.completed)
    .fetch_one(&pool)
    .await?;

    let records = sqlx::query_as::<_, TaskRecord>(&format!(
        "SELECT {}
         FROM tasks
         WHERE ($1::BOOLEAN IS NULL OR completed = $1)
         ORDER BY id
         LIMIT $2
         OFFSET $3",
        TASK_COLUMNS
    ))
    .bind(query.completed)
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(ListTasksResponse {
        items: records.into_iter().map(TaskResponse::from).collect(),
        pagination: PaginationMetadata::from_params(&params, total),
    })
}
