//! Error taxonomy for the ingestion pipeline

use std::path::PathBuf;
use std::time::Duration;

use super::files::Disposition;

/// Why a batch could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("{reason}")]
    MalformedPayload { reason: String },

    #[error("record {index}: {reason}")]
    InvalidIdentifier { index: usize, reason: String },
}

impl NormalizeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    pub fn invalid_id(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            index,
            reason: reason.into(),
        }
    }
}

/// Failure reported by a [`TaskGateway`](super::gateway::TaskGateway)
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("upsert did not finish within {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Every way an ingestion run can end badly
///
/// Only `CleanupFailure` happens after the store was mutated; all other
/// variants leave the store untouched. `AlreadyDisposed` is a redelivery of a
/// file an earlier run already settled; it is never reprocessed.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("source file {} does not exist", .0.display())]
    MissingSourceFile(PathBuf),

    #[error("source file {} could not be read: {reason}", path.display())]
    UnreadableSource { path: PathBuf, reason: String },

    #[error("source file {} was already settled as {}", path.display(), disposition.as_str())]
    AlreadyDisposed {
        path: PathBuf,
        disposition: Disposition,
    },

    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("invalid identifier in record {index}: {reason}")]
    InvalidIdentifier { index: usize, reason: String },

    #[error("persistence failed: {0}")]
    PersistenceFailure(#[from] PersistenceError),

    #[error("cleanup of {} failed: {reason}", path.display())]
    CleanupFailure { path: PathBuf, reason: String },
}

impl IngestError {
    /// Stable name used in the ingestion log
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::MissingSourceFile(_) => "MissingSourceFile",
            IngestError::UnreadableSource { .. } => "UnreadableSource",
            IngestError::AlreadyDisposed { .. } => "AlreadyDisposed",
            IngestError::MalformedPayload { .. } => "MalformedPayload",
            IngestError::InvalidIdentifier { .. } => "InvalidIdentifier",
            IngestError::PersistenceFailure(_) => "PersistenceFailure",
            IngestError::CleanupFailure { .. } => "CleanupFailure",
        }
    }
}

impl From<NormalizeError> for IngestError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MalformedPayload { reason } => IngestError::MalformedPayload { reason },
            NormalizeError::InvalidIdentifier { index, reason } => {
                IngestError::InvalidIdentifier { index, reason }
            },
        }
    }
}

/// Reasons the dispatcher refuses an event
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("no ingestion worker is subscribed")]
    NoSubscriber,

    #[error("an ingestion worker is already subscribed")]
    AlreadySubscribed,

    #[error("ingestion queue is full ({capacity} pending events)")]
    QueueFull { capacity: usize },

    #[error("ingestion queue is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_error_maps_onto_taxonomy() {
        let err: IngestError = NormalizeError::invalid_id(3, "\"x\" is not an integer").into();
        assert_eq!(err.kind(), "InvalidIdentifier");
        assert!(err.to_string().contains("record 3"));

        let err: IngestError = NormalizeError::malformed("expected a JSON array").into();
        assert_eq!(err.kind(), "MalformedPayload");
    }

    #[test]
    fn test_already_disposed_names_the_disposition() {
        let err = IngestError::AlreadyDisposed {
            path: PathBuf::from("uploads/a.json"),
            disposition: Disposition::Orphaned,
        };
        assert_eq!(err.kind(), "AlreadyDisposed");
        assert!(err.to_string().ends_with("already settled as orphaned"));
    }

    #[test]
    fn test_persistence_timeout_message() {
        let err = IngestError::from(PersistenceError::Timeout(Duration::from_secs(5)));
        assert_eq!(err.kind(), "PersistenceFailure");
        assert!(err.to_string().contains("5s"));
    }
}
