pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{
    CreateTaskCommand, CreateTaskError, CreateTaskResponse, DeleteTaskCommand, DeleteTaskError,
    DeleteTaskResponse, UpdateTaskCommand, UpdateTaskError, UpdateTaskResponse,
};

pub use queries::{
    GetTaskError, GetTaskQuery, GetTaskResponse, ListTasksError, ListTasksQuery,
    ListTasksResponse,
};

pub use routes::tasks_routes;
pub use types::TaskResponse;
