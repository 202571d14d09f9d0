pub mod users_schema;
pub mod users_service;

pub use users_service::{LoginEndpoint, RefreshEndpoint, RegisterEndpoint};
