//! Uploaded file lifecycle
//!
//! An uploaded file belongs to the pipeline from the moment its event is
//! published until it reaches a terminal disposition: `deleted` after a
//! successful ingestion, `orphaned` when ingestion failed and the file is
//! kept for an operator. A path with a terminal disposition is never
//! touched again.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Dispositions remembered before the oldest are forgotten
pub const DEFAULT_DISPOSITION_HISTORY: usize = 4096;

/// Storage operations the pipeline needs on source files
#[async_trait]
pub trait SourceFiles: Send + Sync {
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// [`SourceFiles`] on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSourceFiles;

#[async_trait]
impl SourceFiles for LocalSourceFiles {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

/// Terminal state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Deleted,
    Orphaned,
    /// Deletion was attempted once and failed; the file is left alone
    DeleteFailed,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Deleted => "deleted",
            Disposition::Orphaned => "orphaned",
            Disposition::DeleteFailed => "delete_failed",
        }
    }
}

/// Result of [`FileLifecycle::delete`]
#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    Failed(io::Error),
    AlreadyDisposed(Disposition),
}

#[derive(Default)]
struct History {
    by_path: HashMap<PathBuf, Disposition>,
    order: VecDeque<PathBuf>,
}

impl History {
    fn claim(&mut self, path: &Path, disposition: Disposition, limit: usize) -> Option<Disposition> {
        if let Some(existing) = self.by_path.get(path) {
            return Some(*existing);
        }

        while self.order.len() >= limit {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.by_path.remove(&oldest);
                },
                None => break,
            }
        }

        self.by_path.insert(path.to_path_buf(), disposition);
        self.order.push_back(path.to_path_buf());
        None
    }
}

/// Gives each uploaded file at most one terminal disposition
pub struct FileLifecycle {
    files: Arc<dyn SourceFiles>,
    history: Mutex<History>,
    history_limit: usize,
}

impl FileLifecycle {
    pub fn new(files: Arc<dyn SourceFiles>) -> Self {
        Self::with_history_limit(files, DEFAULT_DISPOSITION_HISTORY)
    }

    pub fn with_history_limit(files: Arc<dyn SourceFiles>, history_limit: usize) -> Self {
        Self {
            files,
            history: Mutex::new(History::default()),
            history_limit: history_limit.max(1),
        }
    }

    pub fn local() -> Self {
        Self::new(Arc::new(LocalSourceFiles))
    }

    pub async fn exists(&self, path: &Path) -> io::Result<bool> {
        self.files.exists(path).await
    }

    pub async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.read(path).await
    }

    /// Delete the file, once
    ///
    /// Never fails: an I/O error comes back as [`DeleteOutcome::Failed`] and
    /// the path is marked so no second attempt is made.
    pub async fn delete(&self, path: &Path) -> DeleteOutcome {
        if let Some(existing) = self.claim(path, Disposition::Deleted) {
            tracing::debug!(file = %path.display(), disposition = existing.as_str(), "File already disposed");
            return DeleteOutcome::AlreadyDisposed(existing);
        }

        match self.files.remove(path).await {
            Ok(()) => {
                tracing::debug!(file = %path.display(), "Source file deleted");
                DeleteOutcome::Deleted
            },
            Err(e) => {
                self.set(path, Disposition::DeleteFailed);
                tracing::warn!(file = %path.display(), error = %e, "Failed to delete source file");
                DeleteOutcome::Failed(e)
            },
        }
    }

    /// Keep the file on disk as orphaned
    ///
    /// Returns the earlier disposition when the path was already settled.
    pub fn retain(&self, path: &Path) -> Option<Disposition> {
        let existing = self.claim(path, Disposition::Orphaned);
        if existing.is_none() {
            tracing::info!(file = %path.display(), "Source file retained as orphaned");
        }
        existing
    }

    pub fn disposition(&self, path: &Path) -> Option<Disposition> {
        self.lock().by_path.get(path).copied()
    }

    fn claim(&self, path: &Path, disposition: Disposition) -> Option<Disposition> {
        let limit = self.history_limit;
        self.lock().claim(path, disposition, limit)
    }

    fn set(&self, path: &Path, disposition: Disposition) {
        if let Some(entry) = self.lock().by_path.get_mut(path) {
            *entry = disposition;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// List upload files left behind by earlier runs
///
/// Hidden entries (in-progress `.partial` writes) are skipped.
pub async fn scan_orphans(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut orphans = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(orphans),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type().await?.is_file() {
            orphans.push(entry.path());
        }
    }

    orphans.sort();
    Ok(orphans)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts removals and fails every one of them
    #[derive(Default)]
    struct BrokenRemove {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl SourceFiles for BrokenRemove {
        async fn exists(&self, _path: &Path) -> io::Result<bool> {
            Ok(true)
        }

        async fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
            Ok(b"[]".to_vec())
        }

        async fn remove(&self, _path: &Path) -> io::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[tokio::test]
    async fn test_delete_removes_file_exactly_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.json");
        tokio::fs::write(&path, b"[]").await.unwrap();

        let lifecycle = FileLifecycle::local();

        assert!(matches!(lifecycle.delete(&path).await, DeleteOutcome::Deleted));
        assert!(!path.exists());
        assert!(matches!(
            lifecycle.delete(&path).await,
            DeleteOutcome::AlreadyDisposed(Disposition::Deleted)
        ));
        assert_eq!(lifecycle.disposition(&path), Some(Disposition::Deleted));
    }

    #[tokio::test]
    async fn test_failed_delete_is_not_retried() {
        let files = Arc::new(BrokenRemove::default());
        let lifecycle = FileLifecycle::new(files.clone());
        let path = Path::new("uploads/batch.json");

        assert!(matches!(lifecycle.delete(path).await, DeleteOutcome::Failed(_)));
        assert!(matches!(
            lifecycle.delete(path).await,
            DeleteOutcome::AlreadyDisposed(Disposition::DeleteFailed)
        ));
        assert_eq!(files.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retained_file_is_never_deleted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"[{").await.unwrap();

        let lifecycle = FileLifecycle::local();

        assert_eq!(lifecycle.retain(&path), None);
        assert_eq!(lifecycle.retain(&path), Some(Disposition::Orphaned));
        assert!(matches!(
            lifecycle.delete(&path).await,
            DeleteOutcome::AlreadyDisposed(Disposition::Orphaned)
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_history_forgets_oldest_paths() {
        let lifecycle = FileLifecycle::with_history_limit(Arc::new(LocalSourceFiles), 2);

        lifecycle.retain(Path::new("a"));
        lifecycle.retain(Path::new("b"));
        lifecycle.retain(Path::new("c"));

        assert_eq!(lifecycle.disposition(Path::new("a")), None);
        assert_eq!(lifecycle.disposition(Path::new("c")), Some(Disposition::Orphaned));
    }

    #[tokio::test]
    async fn test_scan_orphans_skips_partial_uploads() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("b.json"), b"[]").await.unwrap();
        tokio::fs::write(dir.path().join("a.json"), b"[]").await.unwrap();
        tokio::fs::write(dir.path().join(".c.partial"), b"[").await.unwrap();
        tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();

        let orphans = scan_orphans(dir.path()).await.unwrap();

        assert_eq!(orphans, vec![dir.path().join("a.json"), dir.path().join("b.json")]);
    }

    #[tokio::test]
    async fn test_scan_orphans_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let orphans = scan_orphans(&dir.path().join("absent")).await.unwrap();
        assert!(orphans.is_empty());
    }
}
