//! Ingestion configuration
//!
//! Read from `INGEST_*` environment variables. Unlike the server settings,
//! a value that is present but unparsable is an error rather than a silent
//! fallback to the default.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use taskflow_common::{Result, TaskflowError};

// ============================================================================
// Ingestion Defaults
// ============================================================================

pub const DEFAULT_UPLOAD_DIR: &str = "data/uploads";

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

pub const DEFAULT_PERSIST_TIMEOUT_SECS: u64 = 30;

/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_INGEST_LOG_FILE: &str = "logs/ingestion.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory uploaded batches are written to
    pub upload_dir: PathBuf,
    /// Pending events the dispatcher holds before rejecting new ones
    pub queue_capacity: usize,
    /// Upper bound for one batch upsert
    pub persist_timeout_secs: u64,
    pub max_upload_bytes: usize,
    /// Append-only outcome log
    pub log_file: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            persist_timeout_secs: DEFAULT_PERSIST_TIMEOUT_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_file: PathBuf::from(DEFAULT_INGEST_LOG_FILE),
        }
    }
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            upload_dir: std::env::var("INGEST_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            queue_capacity: env_or("INGEST_QUEUE_CAPACITY", defaults.queue_capacity)?,
            persist_timeout_secs: env_or(
                "INGEST_PERSIST_TIMEOUT_SECS",
                defaults.persist_timeout_secs,
            )?,
            max_upload_bytes: env_or("INGEST_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            log_file: std::env::var("INGEST_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upload_dir.as_os_str().is_empty() {
            return Err(TaskflowError::config("INGEST_UPLOAD_DIR cannot be empty"));
        }
        if self.queue_capacity == 0 {
            return Err(TaskflowError::config(
                "INGEST_QUEUE_CAPACITY must be greater than 0",
            ));
        }
        if self.persist_timeout_secs == 0 {
            return Err(TaskflowError::config(
                "INGEST_PERSIST_TIMEOUT_SECS must be greater than 0",
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(TaskflowError::config(
                "INGEST_MAX_UPLOAD_BYTES must be greater than 0",
            ));
        }
        if self.log_file.as_os_str().is_empty() {
            return Err(TaskflowError::config("INGEST_LOG_FILE cannot be empty"));
        }
        Ok(())
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_secs(self.persist_timeout_secs)
    }

    /// Create the upload directory and the log file's parent directory
    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        if let Some(parent) = self.log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::debug!(
            upload_dir = %self.upload_dir.display(),
            log_file = %self.log_file.display(),
            "Ingestion directories ready"
        );
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| TaskflowError::InvalidEnv {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const KEYS: [&str; 5] = [
        "INGEST_UPLOAD_DIR",
        "INGEST_QUEUE_CAPACITY",
        "INGEST_PERSIST_TIMEOUT_SECS",
        "INGEST_MAX_UPLOAD_BYTES",
        "INGEST_LOG_FILE",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();

        let config = IngestConfig::from_env().unwrap();

        assert_eq!(config, IngestConfig::default());
        assert_eq!(config.persist_timeout(), Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("INGEST_UPLOAD_DIR", "/tmp/taskflow-uploads");
        std::env::set_var("INGEST_QUEUE_CAPACITY", "8");
        std::env::set_var("INGEST_PERSIST_TIMEOUT_SECS", " 5 ");

        let config = IngestConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.upload_dir, PathBuf::from("/tmp/taskflow-uploads"));
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.persist_timeout_secs, 5);
    }

    #[test]
    #[serial]
    fn test_unparsable_value_is_an_error() {
        clear_env();
        std::env::set_var("INGEST_QUEUE_CAPACITY", "lots");

        let err = IngestConfig::from_env().unwrap_err();
        clear_env();

        assert!(matches!(
            err,
            TaskflowError::InvalidEnv { ref key, ref value }
                if key == "INGEST_QUEUE_CAPACITY" && value == "lots"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = IngestConfig {
            queue_capacity: 0,
            ..IngestConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IngestConfig {
            persist_timeout_secs: 0,
            ..IngestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_ensure_directories_creates_both_paths() {
        let dir = TempDir::new().unwrap();
        let config = IngestConfig {
            upload_dir: dir.path().join("uploads"),
            log_file: dir.path().join("logs").join("ingestion.log"),
            ..IngestConfig::default()
        };

        config.ensure_directories().await.unwrap();

        assert!(dir.path().join("uploads").is_dir());
        assert!(dir.path().join("logs").is_dir());
    }
}
