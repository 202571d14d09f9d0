use std::sync::Arc;

use anyhow::Result;
use axum::http::Method;
use brandhub_core::HubError;
use brandhub_store::User;

use crate::pipeline::{Pipeline, RequestCx};

pub mod admin;
pub mod contacts;
pub mod tasks;
pub mod users;

/// `(method, path, endpoint name)` for every routed endpoint.
pub fn routes() -> Vec<(Method, &'static str, &'static str)> {
    vec![
        (Method::POST, "/register", "register"),
        (Method::POST, "/login", "login"),
        (Method::POST, "/token/refresh", "token-refresh"),
        (Method::POST, "/create-task", "create-task"),
        (Method::PUT, "/update-task", "update-task"),
        (Method::DELETE, "/delete-task", "delete-task"),
        (Method::GET, "/my-tasks", "my-tasks"),
        (Method::POST, "/contact-us", "contact-us"),
        (Method::GET, "/admin/brands", "admin-brands"),
        (Method::POST, "/admin/register/{brand_id}", "admin-register"),
        (Method::POST, "/admin/login/{brand_id}", "admin-login"),
        (Method::GET, "/admin/users", "admin-users"),
        (Method::PUT, "/admin/user/{userid}", "admin-update-user"),
        (Method::DELETE, "/admin/user/{userid}", "admin-delete-user"),
        (Method::GET, "/admin/contacts", "admin-contacts"),
        (Method::PUT, "/admin/contact/{contact_id}", "admin-modify-contact"),
    ]
}

pub fn configure(pipeline: &mut Pipeline) {
    pipeline.register("register", Arc::new(users::RegisterEndpoint));
    pipeline.register("login", Arc::new(users::LoginEndpoint));
    pipeline.register("token-refresh", Arc::new(users::RefreshEndpoint));

    pipeline.register("create-task", Arc::new(tasks::CreateTaskEndpoint));
    pipeline.register("update-task", Arc::new(tasks::UpdateTaskEndpoint));
    pipeline.register("delete-task", Arc::new(tasks::DeleteTaskEndpoint));
    pipeline.register("my-tasks", Arc::new(tasks::MyTasksEndpoint));

    pipeline.register("contact-us", Arc::new(contacts::ContactUsEndpoint));

    pipeline.register("admin-brands", Arc::new(admin::ListBrandsEndpoint));
    pipeline.register("admin-register", Arc::new(admin::AdminRegisterEndpoint));
    pipeline.register("admin-login", Arc::new(admin::AdminLoginEndpoint));
    pipeline.register("admin-users", Arc::new(admin::AdminUsersEndpoint));
    pipeline.register("admin-update-user", Arc::new(admin::AdminUpdateUserEndpoint));
    pipeline.register("admin-delete-user", Arc::new(admin::AdminDeleteUserEndpoint));
    pipeline.register("admin-contacts", Arc::new(admin::AdminContactsEndpoint));
    pipeline.register("admin-modify-contact", Arc::new(admin::AdminModifyContactEndpoint));
}

/// The authenticated end user's row. A deleted or deactivated user is
/// treated as unauthenticated even while their token is still valid.
pub(crate) async fn current_user(cx: &mut RequestCx<'_>) -> Result<User> {
    let id = cx.principal()?.id;
    match cx.session.get::<User>(id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(HubError::not_authenticated("User not found or inactive").into_anyhow()),
    }
}
