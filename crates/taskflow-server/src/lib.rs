//! Taskflow Server Library
//!
//! Task CRUD over HTTP plus an asynchronous bulk-ingestion path.
//!
//! # Overview
//!
//! - **API**: `/api/v1/tasks` CRUD and `/api/v1/uploads` batch uploads
//! - **Ingestion**: uploads are acknowledged immediately and reconciled into
//!   the task store by a background worker (see [`ingest`])
//! - **Database**: PostgreSQL through SQLx, one embedded migration
//! - **Configuration**: environment variables, optionally from `.env`
//!
//! # Architecture
//!
//! Feature slices follow CQRS: commands mutate state, queries read it. Both
//! are plain request structs with a standalone `handle` function. Routes in
//! each slice's `routes.rs` call `handle` directly; [`cqrs::build_mediator`]
//! offers the task handlers behind a mediator for callers outside HTTP.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskflow_server::ingest::{EventDispatcher, IngestionEvent};
//!
//! let dispatcher = Arc::new(EventDispatcher::new(64));
//! // Rejected until a worker subscribes
//! assert!(dispatcher.publish(IngestionEvent::new("data/uploads/batch.json")).is_err());
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;

pub use error::AppError;
