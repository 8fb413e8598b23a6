//! Ingestion outcome log
//!
//! Each terminal state of an ingestion run produces one line of the form
//! `<RFC3339 timestamp> - <outcome> - <detail>`.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    Done,
    Failed,
    CleanupFailed,
    /// The event never reached the worker
    Rejected,
}

impl LogOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOutcome::Done => "done",
            LogOutcome::Failed => "failed",
            LogOutcome::CleanupFailed => "cleanup_failed",
            LogOutcome::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LogOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub outcome: LogOutcome,
    pub detail: String,
}

impl LogEntry {
    pub fn new(outcome: LogOutcome, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.outcome,
            self.detail
        )
    }
}

/// Destination for ingestion outcomes
///
/// Recording must not fail the pipeline; implementations swallow and trace
/// their own errors.
#[async_trait]
pub trait IngestionLog: Send + Sync {
    async fn record(&self, entry: LogEntry);
}

/// Append-only text file, one entry per line
pub struct AppendOnlyLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AppendOnlyLog {
    /// Open (or create) the log file, creating parent directories as needed
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IngestionLog for AppendOnlyLog {
    async fn record(&self, entry: LogEntry) {
        match entry.outcome {
            LogOutcome::Done => {
                tracing::info!(outcome = %entry.outcome, detail = %entry.detail, "Ingestion finished")
            },
            LogOutcome::Failed | LogOutcome::Rejected => {
                tracing::error!(outcome = %entry.outcome, detail = %entry.detail, "Ingestion failed")
            },
            LogOutcome::CleanupFailed => {
                tracing::warn!(outcome = %entry.outcome, detail = %entry.detail, "Ingestion cleanup failed")
            },
        }

        let line = format!("{}\n", entry);
        let mut file = self.file.lock().await;
        let written = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to append to ingestion log"
            );
        }
    }
}
