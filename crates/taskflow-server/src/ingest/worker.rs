//! Ingestion worker
//!
//! Drives one event through
//! `received -> validating -> persisting -> cleanup -> done`. Validation and
//! persistence failures exit to `failed`, which keeps the source file on
//! disk. Nothing is retried: a redelivered event whose file already has a
//! disposition ends `failed` without touching the store.

use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::dispatcher::EventHandler;
use super::error::{IngestError, PersistenceError};
use super::event::IngestionEvent;
use super::files::{DeleteOutcome, FileLifecycle};
use super::gateway::TaskGateway;
use super::normalizer;
use super::sink::{IngestionLog, LogEntry, LogOutcome};
use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Validating,
    Persisting,
    Cleanup,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Received => "received",
            PipelineState::Validating => "validating",
            PipelineState::Persisting => "persisting",
            PipelineState::Cleanup => "cleanup",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// What happened to one event
#[derive(Debug)]
pub struct IngestionReport {
    pub event_id: Uuid,
    pub file_path: PathBuf,
    pub state: PipelineState,
    /// Tasks that survived normalization
    pub records: usize,
    /// Rows the gateway reported as inserted or updated
    pub affected: u64,
    pub error: Option<IngestError>,
    /// Set when the batch was stored but the source file could not be removed
    pub cleanup_error: Option<IngestError>,
}

impl IngestionReport {
    fn new(event: &IngestionEvent) -> Self {
        Self {
            event_id: event.id(),
            file_path: event.file_path().to_path_buf(),
            state: PipelineState::Received,
            records: 0,
            affected: 0,
            error: None,
            cleanup_error: None,
        }
    }
}

pub struct IngestionWorker {
    gateway: Arc<dyn TaskGateway>,
    lifecycle: Arc<FileLifecycle>,
    log: Arc<dyn IngestionLog>,
    persist_timeout: Duration,
}

impl IngestionWorker {
    pub fn new(
        gateway: Arc<dyn TaskGateway>,
        lifecycle: Arc<FileLifecycle>,
        log: Arc<dyn IngestionLog>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            lifecycle,
            log,
            persist_timeout,
        }
    }

    /// Run one event to a terminal state
    pub async fn process(&self, event: &IngestionEvent) -> IngestionReport {
        let mut report = IngestionReport::new(event);
        let path = event.file_path();

        report.state = PipelineState::Validating;
        let tasks = match self.load(path).await {
            Ok(tasks) => tasks,
            Err(err) => return self.fail(report, err).await,
        };
        report.records = tasks.len();
        tracing::debug!(records = tasks.len(), "Batch validated");

        report.state = PipelineState::Persisting;
        report.affected = match self.persist(&tasks).await {
            Ok(affected) => affected,
            Err(err) => return self.fail(report, err.into()).await,
        };

        report.state = PipelineState::Cleanup;
        match self.lifecycle.delete(path).await {
            DeleteOutcome::Deleted => {},
            DeleteOutcome::Failed(e) => {
                let err = IngestError::CleanupFailure {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                };
                self.log
                    .record(LogEntry::new(
                        LogOutcome::CleanupFailed,
                        format!("{}: {} {}", err.kind(), report.event_id, err),
                    ))
                    .await;
                report.cleanup_error = Some(err);
            },
            DeleteOutcome::AlreadyDisposed(disposition) => {
                tracing::warn!(
                    file = %path.display(),
                    disposition = disposition.as_str(),
                    "Source file was already disposed"
                );
            },
        }

        report.state = PipelineState::Done;
        self.log
            .record(LogEntry::new(
                LogOutcome::Done,
                format!(
                    "{} {}: {} records, {} rows affected",
                    report.event_id,
                    path.display(),
                    report.records,
                    report.affected
                ),
            ))
            .await;

        report
    }

    async fn load(&self, path: &Path) -> Result<Vec<Task>, IngestError> {
        let unreadable = |e: io::Error| IngestError::UnreadableSource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        if !self.lifecycle.exists(path).await.map_err(unreadable)? {
            return Err(IngestError::MissingSourceFile(path.to_path_buf()));
        }

        // Still on disk but already orphaned or failed to delete
        if let Some(disposition) = self.lifecycle.disposition(path) {
            return Err(IngestError::AlreadyDisposed {
                path: path.to_path_buf(),
                disposition,
            });
        }

        let bytes = self.lifecycle.read(path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                IngestError::MissingSourceFile(path.to_path_buf())
            } else {
                unreadable(e)
            }
        })?;

        Ok(normalizer::normalize(&bytes)?)
    }

    async fn persist(&self, tasks: &[Task]) -> Result<u64, PersistenceError> {
        match tokio::time::timeout(self.persist_timeout, self.gateway.upsert_batch(tasks)).await {
            Ok(result) => result,
            Err(_) => Err(PersistenceError::Timeout(self.persist_timeout)),
        }
    }

    async fn fail(&self, mut report: IngestionReport, err: IngestError) -> IngestionReport {
        // A missing or already settled file keeps what it has
        if !matches!(
            err,
            IngestError::MissingSourceFile(_) | IngestError::AlreadyDisposed { .. }
        ) {
            self.lifecycle.retain(&report.file_path);
        }

        self.log
            .record(LogEntry::new(
                LogOutcome::Failed,
                format!("{}: {} {}", err.kind(), report.event_id, err),
            ))
            .await;

        report.state = PipelineState::Failed;
        report.error = Some(err);
        report
    }
}

#[async_trait]
impl EventHandler for IngestionWorker {
    async fn handle(&self, event: &IngestionEvent) {
        let report = self.process(event).await;
        tracing::debug!(
            state = report.state.as_str(),
            records = report.records,
            affected = report.affected,
            "Ingestion event handled"
        );
    }
}
