use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::tasks::types::TaskResponse;
use crate::models::{TaskRecord, TASK_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTaskQuery {
    pub id: i64,
}

pub type GetTaskResponse = TaskResponse;

#[derive(Debug, thiserror::Error)]
pub enum GetTaskError {
    #[error("Task with id {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<GetTaskResponse, GetTaskError>> for GetTaskQuery {}

impl crate::cqrs::middleware::Query for GetTaskQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetTaskQuery) -> Result<GetTaskResponse, GetTaskError> {
    let record = sqlx::query_as::<_, TaskRecord>(&format!(
        "SELECT {} FROM tasks WHERE id = $1",
        TASK_COLUMNS
    ))
    .bind(query.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetTaskError::NotFound(query.id))?;

    Ok(record.into())
}
