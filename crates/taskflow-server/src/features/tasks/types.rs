//! Task representation returned by the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRecord> for TaskResponse {
    fn from(record: TaskRecord) -> Self {
        let created_at = record.created_at;
        let updated_at = record.updated_at;
        let task = Task::from(record);

        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            extra: task.extra,
            created_at,
            updated_at,
        }
    }
}
