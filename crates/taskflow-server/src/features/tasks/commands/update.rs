//! Update task command
//!
//! Partially updates an existing task. Only the fields that are provided
//! are changed.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};

use crate::features::shared::validation::{
    validate_description, validate_title, DescriptionValidationError, TitleValidationError,
};
use crate::features::tasks::types::TaskResponse;
use crate::models::{TaskRecord, TASK_COLUMNS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskCommand {
    /// Taken from the request path
    #[serde(default)]
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Replaces the stored extra fields as a whole
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

pub type UpdateTaskResponse = TaskResponse;

#[derive(Debug, thiserror::Error)]
pub enum UpdateTaskError {
    #[error("At least one field must be provided for update")]
    NoFieldsToUpdate,

    #[error("Title validation failed: {0}")]
    TitleValidation(#[from] TitleValidationError),

    #[error("Description validation failed: {0}")]
    DescriptionValidation(#[from] DescriptionValidationError),

    #[error("Task with id {0} not found")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<UpdateTaskResponse, UpdateTaskError>> for UpdateTaskCommand {}

impl crate::cqrs::middleware::Command for UpdateTaskCommand {}

impl UpdateTaskCommand {
    pub fn validate(&self) -> Result<(), UpdateTaskError> {
        if self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.extra.is_none()
        {
            return Err(UpdateTaskError::NoFieldsToUpdate);
        }
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(ref description) = self.description {
            validate_description(description)?;
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(id = command.id))]
pub async fn handle(
    pool: PgPool,
    command: UpdateTaskCommand,
) -> Result<UpdateTaskResponse, UpdateTaskError> {
    command.validate()?;

    let record = sqlx::query_as::<_, TaskRecord>(&format!(
        "UPDATE tasks
         SET title = COALESCE($2, title),
             description = COALESCE($3, description),
             completed = COALESCE($4, completed),
             extra = COALESCE($5, extra),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(command.id)
    .bind(command.title.as_deref())
    .bind(command.description.as_deref())
    .bind(command.completed)
    .bind(command.extra.as_ref().map(Json))
    .fetch_optional(&pool)
    .await?
    .ok_or(UpdateTaskError::NotFound(command.id))?;

    tracing::info!(task_id = record.id, "Task updated");

    Ok(record.into())
}
