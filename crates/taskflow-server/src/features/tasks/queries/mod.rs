pub mod get;
pub mod list;

pub use get::{GetTaskError, GetTaskQuery, GetTaskResponse};
pub use list::{ListTasksError, ListTasksQuery, ListTasksResponse};
