//! Ingestion events handed from the upload endpoint to the worker

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A completed upload waiting to be ingested
///
/// Created once per upload and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionEvent {
    id: Uuid,
    file_path: PathBuf,
    submitted_at: DateTime<Utc>,
}

impl IngestionEvent {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_path: file_path.into(),
            submitted_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}
