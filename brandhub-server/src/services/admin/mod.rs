pub mod admin_schema;
pub mod admin_service;

pub use admin_service::{
    AdminContactsEndpoint, AdminDeleteUserEndpoint, AdminLoginEndpoint, AdminModifyContactEndpoint,
    AdminRegisterEndpoint, AdminUpdateUserEndpoint, AdminUsersEndpoint, ListBrandsEndpoint,
};
