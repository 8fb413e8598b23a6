//! Asynchronous bulk ingestion
//!
//! An upload is acknowledged as soon as its file is on disk. The rest happens
//! off the request path:
//!
//! ```text
//! upload route -> EventDispatcher -> IngestionWorker
//!                                      |- normalizer   (bytes -> tasks)
//!                                      |- TaskGateway  (one batch upsert)
//!                                      |- FileLifecycle (delete or retain)
//!                                      '- IngestionLog (one line per outcome)
//! ```
//!
//! # Modules
//!
//! - **config**: `INGEST_*` settings and directory bootstrapping
//! - **dispatcher**: bounded single-subscriber event queue
//! - **error**: pipeline error taxonomy
//! - **event**: the event handed from upload to worker
//! - **files**: source file access and terminal dispositions
//! - **gateway**: batch upsert into the `tasks` table
//! - **normalizer**: payload parsing and id coercion
//! - **sink**: append-only outcome log
//! - **worker**: the per-event state machine

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod files;
pub mod gateway;
pub mod normalizer;
pub mod sink;
pub mod worker;

pub use config::IngestConfig;
pub use dispatcher::{EventDispatcher, EventHandler};
pub use error::{DispatchError, IngestError, NormalizeError, PersistenceError};
pub use event::IngestionEvent;
pub use files::{DeleteOutcome, Disposition, FileLifecycle, LocalSourceFiles, SourceFiles};
pub use gateway::{PgTaskGateway, TaskGateway};
pub use normalizer::CandidateRecord;
pub use sink::{AppendOnlyLog, IngestionLog, LogEntry, LogOutcome};
pub use worker::{IngestionReport, IngestionWorker, PipelineState};
