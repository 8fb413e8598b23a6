//! Batch uploads feeding the ingestion pipeline

pub mod commands;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use crate::ingest::{EventDispatcher, FileLifecycle, IngestionLog};

pub use commands::{UploadBatchCommand, UploadBatchError, UploadBatchResponse};
pub use routes::uploads_routes;

/// State shared by the upload routes
#[derive(Clone)]
pub struct UploadState {
    pub dispatcher: Arc<EventDispatcher>,
    pub lifecycle: Arc<FileLifecycle>,
    pub log: Arc<dyn IngestionLog>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}
