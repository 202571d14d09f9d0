use anyhow::Result;
use async_trait::async_trait;
use brandhub_auth::{authorize_tenant, require_admin, TokenType};
use brandhub_core::{ApiResponse, HubError, Principal};
use brandhub_store::User;
use serde_json::json;
use tracing::info;

use super::users_schema::{Login, Refresh, RegisterUser, LOGIN_ERROR, REGISTER_ERROR};
use crate::pipeline::{Access, Endpoint, RequestCx};
use crate::utils::validation::validate;

/// `POST /register`
pub struct RegisterEndpoint;

#[async_trait]
impl Endpoint for RegisterEndpoint {
    fn access(&self) -> Access {
        Access::Public
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let input: RegisterUser = validate(&cx.req.body, REGISTER_ERROR)?;
        let brand = cx.tenant.name.clone();
        let email = input.email;

        let taken = {
            let (email, brand) = (email.clone(), brand.clone());
            cx.session
                .find_one::<User, _>(move |u| u.brand_name == brand && u.email.eq_ignore_ascii_case(&email))
                .await?
                .is_some()
        };
        if taken {
            return Err(HubError::conflict("User with this email already exists in this brand").into_anyhow());
        }

        let hash = cx.state.passwords.hash(&input.password)?;
        let mut user = User::new(input.firstname, input.surname, email, hash, brand.clone());
        user.number_task = cx.state.settings.default_task_quota;
        user.valid_user = cx.state.settings.auto_validate;
        let user = cx.session.insert(user).await?;

        let principal = Principal::user(user.userid, brand);
        cx.session.act_as(principal.clone())?;
        let tokens = cx.state.tokens.issue_pair(&principal)?;

        info!(userid = user.userid, "user registered");
        Ok(ApiResponse::created(
            "User registered successfully",
            json!({ "user": user.public(), "tokens": tokens }),
        ))
    }
}

/// `POST /login`
pub struct LoginEndpoint;

#[async_trait]
impl Endpoint for LoginEndpoint {
    fn access(&self) -> Access {
        Access::Public
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let input: Login = validate(&cx.req.body, LOGIN_ERROR)?;
        let brand = cx.tenant.name.clone();
        let email = input.email;

        let user = {
            let brand = brand.clone();
            cx.session
                .find_one::<User, _>(move |u| u.brand_name == brand && u.email.eq_ignore_ascii_case(&email))
                .await?
        };

        // One answer for unknown, inactive and wrong-password.
        let user = match user {
            Some(u) if u.is_active && cx.state.passwords.verify(&input.password, &u.password) => u,
            _ => return Err(HubError::not_authenticated("Invalid email or password").into_anyhow()),
        };

        let principal = Principal::user(user.userid, brand);
        cx.session.act_as(principal.clone())?;
        let tokens = cx.state.tokens.issue_pair(&principal)?;

        Ok(ApiResponse::ok(
            "Login successful",
            json!({ "user": user.public(), "tokens": tokens }),
        ))
    }
}

/// `POST /token/refresh`
pub struct RefreshEndpoint;

#[async_trait]
impl Endpoint for RefreshEndpoint {
    fn access(&self) -> Access {
        Access::Public
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let input: Refresh = validate(&cx.req.body, "A refresh token is required")?;
        let claims = cx
            .state
            .tokens
            .verify_refresh(&input.refresh)
            .map_err(|e| HubError::not_authenticated(e.to_string()).into_anyhow())?;
        let principal = authorize_tenant(&claims)?;
        cx.session.act_as(principal.clone())?;

        // The principal must still exist and be allowed in.
        if principal.is_admin() {
            require_admin(&mut cx.session, &principal)
                .await
                .map_err(|_| HubError::not_authenticated("Invalid or expired token").into_anyhow())?;
        } else {
            let alive = cx
                .session
                .get::<User>(principal.id)
                .await?
                .is_some_and(|u| u.is_active && u.brand_name == principal.tenant);
            if !alive {
                return Err(HubError::not_authenticated("Invalid or expired token").into_anyhow());
            }
        }

        let access = cx.state.tokens.issue(&principal, TokenType::Access)?;
        Ok(ApiResponse::ok("Token refreshed", json!({ "access": access })))
    }
}
