use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTaskCommand {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTaskResponse {
    pub id: i64,
    pub deleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteTaskError {
    #[error("Task with id {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DeleteTaskResponse, DeleteTaskError>> for DeleteTaskCommand {}

impl crate::cqrs::middleware::Command for DeleteTaskCommand {}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    command: DeleteTaskCommand,
) -> Result<DeleteTaskResponse, DeleteTaskError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(command.id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DeleteTaskError::NotFound(command.id));
    }

    Ok(DeleteTaskResponse {
        id: command.id,
        deleted: true,
    })
}
