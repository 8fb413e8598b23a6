//! Create task command
//!
//! The id is normally assigned by the database. A caller may supply one
//! explicitly (the same id space the ingestion pipeline writes into); a
//! clash with an existing task is a conflict, never an overwrite.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};

use crate::features::shared::validation::{
    validate_description, validate_title, DescriptionValidationError, TitleValidationError,
};
use crate::features::tasks::types::TaskResponse;
use crate::ingest::gateway::SYNC_ID_SEQUENCE_SQL;
use crate::models::{TaskRecord, TASK_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskCommand {
    /// Explicit id; assigned by the database when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub completed: bool,

    /// Free-form fields stored alongside the task
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub type CreateTaskResponse = TaskResponse;

#[derive(Debug, thiserror::Error)]
pub enum CreateTaskError {
    #[error("Title validation failed: {0}")]
    TitleValidation(#[from] TitleValidationError),

    #[error("Description validation failed: {0}")]
    DescriptionValidation(#[from] DescriptionValidationError),

    #[error("Task with id {0} already exists")]
    Duplicate(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<CreateTaskResponse, CreateTaskError>> for CreateTaskCommand {}

impl crate::cqrs::middleware::Command for CreateTaskCommand {}

impl CreateTaskCommand {
    #[tracing::instrument(skip(self), fields(title = %self.title))]
    pub fn validate(&self) -> Result<(), CreateTaskError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;

        tracing::debug!("Command validation passed");
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(id = ?command.id, title = %command.title))]
pub async fn handle(
    pool: PgPool,
    command: CreateTaskCommand,
) -> Result<CreateTaskResponse, CreateTaskError> {
    command.validate()?;

    let record = match command.id {
        Some(id) => insert_with_id(&pool, id, &command).await?,
        None => {
            sqlx::query_as::<_, TaskRecord>(&format!(
                "INSERT INTO tasks (title, description, completed, extra)
                 VALUES ($1, $2, $3, $4)
                 RETURNING {}",
                TASK_COLUMNS
            ))
            .bind(&command.title)
            .bind(&command.description)
            .bind(command.completed)
            .bind(Json(&command.extra))
            .fetch_one(&pool)
            .await?
        },
    };

    tracing::info!(task_id = record.id, "Task created successfully");

    Ok(record.into())
}

async fn insert_with_id(
    pool: &PgPool,
    id: i64,
    command: &CreateTaskCommand,
) -> Result<TaskRecord, CreateTaskError> {
    let mut tx = pool.begin().await?;

    let record = sqlx::query_as::<_, TaskRecord>(&format!(
        "INSERT INTO tasks (id, title, description, completed, extra)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(id)
    .bind(&command.title)
    .bind(&command.description)
    .bind(command.completed)
    .bind(Json(&command.extra))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            return CreateTaskError::Duplicate(id);
        }
        CreateTaskError::Database(e)
    })?;

    sqlx::query(SYNC_ID_SEQUENCE_SQL).execute(&mut *tx).await?;
    tx.commit().await?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(title: &str) -> CreateTaskCommand {
        CreateTaskCommand {
            id: None,
            title: title.to_string(),
            description: String::new(),
            completed: false,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(command("Write report").validate().is_ok());
    }

    #[test]
    fn test_validation_blank_title() {
        assert!(matches!(
            command("  ").validate(),
            Err(CreateTaskError::TitleValidation(TitleValidationError::Required))
        ));
    }

    #[test]
    fn test_command_defaults_from_json() {
        let cmd: CreateTaskCommand = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(cmd.id, None);
        assert_eq!(cmd.description, "");
        assert!(!cmd.completed);
        assert!(cmd.extra.is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_handle_assigns_id(pool: PgPool) -> sqlx::Result<()> {
        let first = handle(pool.clone(), command("a")).await.unwrap();
        let second = handle(pool.clone(), command("b")).await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(second.title, "b");
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_handle_explicit_id_conflict(pool: PgPool) -> sqlx::Result<()> {
        let mut cmd = command("a");
        cmd.id = Some(42);

        assert_eq!(handle(pool.clone(), cmd.clone()).await.unwrap().id, 42);
        assert!(matches!(
            handle(pool.clone(), cmd).await,
            Err(CreateTaskError::Duplicate(42))
        ));

        // Generated ids continue past the explicit one
        assert_eq!(handle(pool.clone(), command("b")).await.unwrap().id, 43);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_handle_explicit_negative_id(pool: PgPool) -> sqlx::Result<()> {
        let mut cmd = command("below the sequence");
        cmd.id = Some(-5);

        assert_eq!(handle(pool.clone(), cmd).await.unwrap().id, -5);
        assert_eq!(handle(pool.clone(), command("b")).await.unwrap().id, 1);
        Ok(())
    }
}
