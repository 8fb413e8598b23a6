//! Taskflow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging bootstrap for the Taskflow workspace.
//!
//! - **Error Handling**: [`TaskflowError`] and the [`Result`] alias
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]
//!
//! # Example
//!
//! ```no_run
//! use taskflow_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("Application started");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{Result, TaskflowError};
