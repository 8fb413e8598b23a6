//! Test doubles for ingestion pipeline tests
//!
//! - `MemoryGateway`: in-memory task store keyed by id
//! - `RecordingLog`: keeps every ingestion log entry for assertions
//! - `UndeletableFiles`: local file access whose `remove` always fails

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskflow_server::ingest::{
    FileLifecycle, IngestionLog, IngestionWorker, LocalSourceFiles, LogEntry, LogOutcome,
    PersistenceError, SourceFiles, TaskGateway,
};
use taskflow_server::models::Task;

pub const TEST_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Gateway
// ============================================================================

#[derive(Default)]
pub struct MemoryGateway {
    rows: Mutex<BTreeMap<i64, Task>>,
    calls: AtomicUsize,
    failure: Option<String>,
    /// Calls left that fail with `failure`
    failures_left: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `PersistenceError::Unavailable`
    pub fn failing(reason: &str) -> Self {
        Self::failing_first(reason, usize::MAX)
    }

    /// The first `times` calls fail, later ones succeed
    pub fn failing_first(reason: &str, times: usize) -> Self {
        Self {
            failure: Some(reason.to_string()),
            failures_left: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    /// Every call sleeps before writing
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> BTreeMap<i64, Task> {
        self.rows.lock().unwrap().clone()
    }

    pub fn get(&self, id: i64) -> Option<Task> {
        self.rows.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl TaskGateway for MemoryGateway {
    async fn upsert_batch(&self, tasks: &[Task]) -> Result<u64, PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = &self.failure {
            let failed = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                    match left {
                        0 => None,
                        usize::MAX => Some(usize::MAX),
                        left => Some(left - 1),
                    }
                })
                .is_ok();
            if failed {
                return Err(PersistenceError::Unavailable(reason.clone()));
            }
        }

        let mut rows = self.rows.lock().unwrap();
        for task in tasks {
            rows.insert(task.id, task.clone());
        }
        Ok(tasks.len() as u64)
    }
}

// ============================================================================
// Ingestion log
// ============================================================================

#[derive(Default)]
pub struct RecordingLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLog {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn with_outcome(&self, outcome: LogOutcome) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.outcome == outcome)
            .collect()
    }
}

#[async_trait]
impl IngestionLog for RecordingLog {
    async fn record(&self, entry: LogEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

// ============================================================================
// Source files
// ============================================================================

/// Reads from disk like [`LocalSourceFiles`] but refuses to delete
#[derive(Default)]
pub struct UndeletableFiles {
    removes: AtomicUsize,
}

impl UndeletableFiles {
    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFiles for UndeletableFiles {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        LocalSourceFiles.exists(path).await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        LocalSourceFiles.read(path).await
    }

    async fn remove(&self, _path: &Path) -> io::Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only upload directory"))
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Worker wired to in-memory doubles
pub struct Harness {
    pub gateway: Arc<MemoryGateway>,
    pub lifecycle: Arc<FileLifecycle>,
    pub log: Arc<RecordingLog>,
    pub worker: Arc<IngestionWorker>,
}

impl Harness {
    pub fn new(gateway: MemoryGateway) -> Self {
        Self::with_lifecycle(gateway, FileLifecycle::local(), TEST_PERSIST_TIMEOUT)
    }

    pub fn with_lifecycle(
        gateway: MemoryGateway,
        lifecycle: FileLifecycle,
        persist_timeout: Duration,
    ) -> Self {
        let gateway = Arc::new(gateway);
        let lifecycle = Arc::new(lifecycle);
        let log = Arc::new(RecordingLog::default());
        let worker = Arc::new(IngestionWorker::new(
            gateway.clone(),
            lifecycle.clone(),
            log.clone(),
            persist_timeout,
        ));

        Self {
            gateway,
            lifecycle,
            log,
            worker,
        }
    }
}

/// Write `content` to `dir/name` and return the full path
pub fn write_batch(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
