pub mod create;
pub mod delete;
pub mod update;

pub use create::{CreateTaskCommand, CreateTaskError, CreateTaskResponse};
pub use delete::{DeleteTaskCommand, DeleteTaskError, DeleteTaskResponse};
pub use update::{UpdateTaskCommand, UpdateTaskError, UpdateTaskResponse};
