use anyhow::Result;
use async_trait::async_trait;
use brandhub_core::{ApiResponse, HubError, InboundRequest};
use brandhub_store::Task;
use serde_json::json;
use tracing::info;

use super::tasks_schema::{check_price_range, CreateTask, PatchTask, TASK_ERROR};
use crate::pipeline::{Access, Endpoint, RequestCx};
use crate::services::current_user;
use crate::utils::validation::validate;

/// Task id from the body, or from `?id=` for clients that cannot send a
/// DELETE body.
fn task_id(req: &InboundRequest) -> Result<u64> {
    let from_body = req.body_field("id").map(|v| {
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    });
    let id = match from_body {
        Some(parsed) => parsed,
        None => match req.query_param("id") {
            Some(raw) => raw.trim().parse().ok(),
            None => return Err(HubError::bad_request("Task ID is required").into_anyhow()),
        },
    };
    id.ok_or_else(|| HubError::bad_request("Task ID must be a positive integer").into_anyhow())
}

fn not_found() -> anyhow::Error {
    HubError::not_found("Task not found or you do not have permission to access it").into_anyhow()
}

/// `POST /create-task`
pub struct CreateTaskEndpoint;

#[async_trait]
impl Endpoint for CreateTaskEndpoint {
    fn access(&self) -> Access {
        Access::User
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let user = current_user(cx).await?;
        if !user.valid_user {
            return Err(HubError::bad_request(
                "You are not able to create a task until an administrator validates your account",
            )
            .into_anyhow());
        }

        let userid = user.userid;
        let held = cx.session.count::<Task, _>(|t| t.userid == userid).await?;
        if held >= user.number_task as usize {
            return Err(HubError::bad_request(
                "Task limit reached, please contact an administrator to raise it",
            )
            .with_errors(json!({ "limit": user.number_task, "current": held }))
            .into_anyhow());
        }

        let input: CreateTask = validate(&cx.req.body, TASK_ERROR)?;
        let task = input.into_task(userid);
        check_price_range(&task)?;

        let task = cx.session.insert(task).await.map_err(|e| {
            match HubError::kind_of(&e) {
                Some(brandhub_core::ErrorKind::Conflict) => HubError::conflict(
                    "You already have a task with this saved search",
                )
                .into_anyhow(),
                _ => e,
            }
        })?;
        // Re-counted at commit so parallel creates cannot overrun the quota.
        cx.session.limit::<Task, _>(
            user.number_task as usize,
            "Task limit reached, please contact an administrator to raise it",
            move |t| t.userid == userid,
        )?;

        info!(task = task.id, userid, "task created");
        Ok(ApiResponse::created("Task created successfully", serde_json::to_value(&task)?))
    }
}

/// `PUT /update-task`
pub struct UpdateTaskEndpoint;

#[async_trait]
impl Endpoint for UpdateTaskEndpoint {
    fn access(&self) -> Access {
        Access::User
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let id = task_id(cx.req)?;
        let user = current_user(cx).await?;
        let patch: PatchTask = validate(&cx.req.body, TASK_ERROR)?;

        let mut task = cx
            .session
            .get::<Task>(id)
            .await?
            .filter(|t| t.userid == user.userid)
            .ok_or_else(not_found)?;

        patch.apply(&mut task);
        check_price_range(&task)?;
        cx.session.update(&mut task).await?;

        Ok(ApiResponse::ok("Task updated successfully", serde_json::to_value(&task)?))
    }
}

/// `DELETE /delete-task`
pub struct DeleteTaskEndpoint;

#[async_trait]
impl Endpoint for DeleteTaskEndpoint {
    fn access(&self) -> Access {
        Access::User
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let id = task_id(cx.req)?;
        let user = current_user(cx).await?;

        let owned = cx
            .session
            .get::<Task>(id)
            .await?
            .is_some_and(|t| t.userid == user.userid);
        if !owned {
            return Err(not_found());
        }
        cx.session.delete::<Task>(id).await?;

        Ok(ApiResponse::ok("Task deleted successfully", json!({ "id": id })))
    }
}

/// `GET /my-tasks?page=&limit=`
pub struct MyTasksEndpoint;

impl MyTasksEndpoint {
    fn paging(cx: &RequestCx<'_>) -> Result<(usize, usize)> {
        let settings = &cx.state.settings;
        let parse = |name: &str, default: usize| -> Result<usize> {
            match cx.req.query_param(name) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        HubError::bad_request(format!("'{name}' must be a positive integer")).into_anyhow()
                    }),
            }
        };
        let page = parse("page", 1)?;
        let limit = parse("limit", settings.page_size)?.min(settings.max_page_size);
        Ok((page, limit))
    }
}

#[async_trait]
impl Endpoint for MyTasksEndpoint {
    fn access(&self) -> Access {
        Access::User
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let (page, limit) = Self::paging(cx)?;
        let user = current_user(cx).await?;
        let userid = user.userid;

        let mut tasks = cx.session.find::<Task, _>(|t| t.userid == userid).await?;
        // newest first; ids break ties within the same instant
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = tasks.len();
        let total_pages = total.div_ceil(limit);
        let items: Vec<&Task> = tasks.iter().skip((page - 1).saturating_mul(limit)).take(limit).collect();

        Ok(ApiResponse::ok(
            "Tasks retrieved successfully",
            json!({
                "tasks": items,
                "pagination": {
                    "current_page": page,
                    "total_pages": total_pages,
                    "total_tasks": total,
                    "has_next": page < total_pages,
                    "has_previous": page > 1,
                    "limit": limit,
                },
                "brand": cx.tenant.name,
            }),
        ))
    }
}
