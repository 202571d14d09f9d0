pub mod tasks_schema;
pub mod tasks_service;

pub use tasks_service::{CreateTaskEndpoint, DeleteTaskEndpoint, MyTasksEndpoint, UpdateTaskEndpoint};
