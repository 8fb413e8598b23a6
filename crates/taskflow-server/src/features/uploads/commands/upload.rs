//! Upload batch command
//!
//! Stores an uploaded batch under the upload directory and hands its path to
//! the ingestion dispatcher. The caller gets an answer as soon as the file is
//! durably on disk; ingestion itself happens later.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::super::UploadState;
use crate::ingest::sink::{LogEntry, LogOutcome};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadBatchCommand {
    /// File name the client sent, for logging only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(skip)]
    pub content: Vec<u8>,
    #[serde(skip)]
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadBatchResponse {
    /// Name of the stored file inside the upload directory
    pub file_name: String,
    pub size: usize,
    /// Set when the batch was queued for ingestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    pub queued: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadBatchError {
    #[error("Content is required and cannot be empty")]
    ContentRequired,
    #[error("Upload of {size} bytes exceeds the limit of {max} bytes")]
    TooLarge { size: usize, max: usize },
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl Request<Result<UploadBatchResponse, UploadBatchError>> for UploadBatchCommand {}

impl crate::cqrs::middleware::Command for UploadBatchCommand {}

impl UploadBatchCommand {
    pub fn validate(&self) -> Result<(), UploadBatchError> {
        if self.content.is_empty() {
            return Err(UploadBatchError::ContentRequired);
        }
        if self.max_bytes > 0 && self.content.len() > self.max_bytes {
            return Err(UploadBatchError::TooLarge {
                size: self.content.len(),
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[tracing::instrument(skip(state, command), fields(original_name = ?command.original_name, size = command.content.len()))]
pub async fn handle(
    state: UploadState,
    command: UploadBatchCommand,
) -> Result<UploadBatchResponse, UploadBatchError> {
    command.validate()?;

    let id = Uuid::new_v4();
    let file_name = format!("{}.json", id);
    let path = state.upload_dir.join(&file_name);

    store(&state.upload_dir, id, &path, &command.content).await?;
    tracing::debug!(file = %path.display(), "Upload stored");

    let event_id = match state.dispatcher.submit_for_ingestion(&path) {
        Ok(event_id) => Some(event_id),
        Err(e) => {
            // The file stays for an operator to reprocess
            state.lifecycle.retain(&path);
            state
                .log
                .record(LogEntry::new(
                    LogOutcome::Rejected,
                    format!("{} {}", path.display(), e),
                ))
                .await;
            None
        },
    };

    Ok(UploadBatchResponse {
        file_name,
        size: command.content.len(),
        queued: event_id.is_some(),
        event_id,
    })
}

/// Write to a hidden partial file, then rename into place
///
/// The worker never sees a half-written batch.
async fn store(dir: &Path, id: Uuid, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let partial = dir.join(format!(".{}.partial", id));

    let written = async {
        let mut file = tokio::fs::File::create(&partial).await?;
        file.write_all(content).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    tokio::fs::rename(&partial, path).await
}
