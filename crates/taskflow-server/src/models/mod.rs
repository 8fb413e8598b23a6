//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Task as written by the CRUD endpoints and the ingestion pipeline
///
/// `extra` carries fields the payload supplied beyond the four known columns;
/// they are stored verbatim in the `extra` JSONB column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Task row as stored in the `tasks` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub extra: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list shared by every query returning a [`TaskRecord`]
pub const TASK_COLUMNS: &str = "id, title, description, completed, extra, created_at, updated_at";

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let extra = match record.extra {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            completed: record.completed,
            extra,
        }
    }
}
