//! Brand-administrator endpoints.
//!
//! Administrators live in the default store but act on one brand. Their
//! tokens carry `principal = admin`; the pipeline has already checked the
//! administrator row before any `Access::Admin` handler runs.

use anyhow::Result;
use async_trait::async_trait;
use brandhub_core::{ApiResponse, ErrorKind, HubError, Principal, Tenant};
use brandhub_store::{BrandAdmin, ContactRequest, Task, User};
use serde_json::{json, Value};
use tracing::info;

use super::admin_schema::{
    PatchContact, PatchUser, RegisterAdmin, ADMIN_REGISTER_ERROR, CONTACT_PATCH_ERROR, USER_PATCH_ERROR,
};
use crate::pipeline::{Access, Endpoint, RequestCx};
use crate::utils::validation::validate;

/// The active brand named by the `brand_id` path parameter.
fn brand_from_path(cx: &RequestCx<'_>) -> Result<Tenant> {
    let id = cx.req.path_id("brand_id")?;
    cx.state
        .registry
        .by_id(id)
        .ok_or_else(|| HubError::not_found("Brand not found").into_anyhow())
}

/// `GET /admin/brands`
pub struct ListBrandsEndpoint;

#[async_trait]
impl Endpoint for ListBrandsEndpoint {
    fn access(&self) -> Access {
        Access::Public
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let brands: Vec<Value> = cx
            .state
            .registry
            .list()
            .into_iter()
            .filter(|t| t.active)
            .map(|t| json!({ "brand_id": t.id, "brand_name": t.name }))
            .collect();
        Ok(ApiResponse::ok("Brands retrieved successfully", json!(brands)))
    }
}

/// `POST /admin/register/{brand_id}`
pub struct AdminRegisterEndpoint;

#[async_trait]
impl Endpoint for AdminRegisterEndpoint {
    fn access(&self) -> Access {
        Access::Public
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let brand = brand_from_path(cx)?;
        let input: RegisterAdmin = validate(&cx.req.body, ADMIN_REGISTER_ERROR)?;

        let hash = cx.state.passwords.hash(&input.password)?;
        let admin = BrandAdmin {
            id: 0,
            firstname: input.firstname,
            surname: input.surname,
            email: input.email,
            password: hash,
            brand_name: brand.name.clone(),
            is_active: false,
            created_at: None,
            updated_at: None,
        };
        let admin = cx.session.insert(admin).await.map_err(|e| match HubError::kind_of(&e) {
            Some(ErrorKind::Conflict) => {
                HubError::conflict("An administrator with this email already exists for this brand").into_anyhow()
            }
            _ => e,
        })?;

        info!(admin = admin.id, brand = %brand.name, "brand admin registered, pending activation");
        Ok(ApiResponse::created(
            "Administrator registered successfully, pending activation",
            admin.public(),
        ))
    }
}

/// `POST /admin/login/{brand_id}`
pub struct AdminLoginEndpoint;

#[async_trait]
impl Endpoint for AdminLoginEndpoint {
    fn access(&self) -> Access {
        Access::Public
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let brand = brand_from_path(cx)?;
        let (email, password) = match cx.req.require_str(&["email", "password"])?.as_slice() {
            [email, password] => (email.to_string(), password.to_string()),
            _ => return Err(HubError::bad_request("Both email and password are required").into_anyhow()),
        };

        // Tokens are bound to the brand, so the request must be admitted under
        // that same brand. Every failure answers alike.
        let denied = || HubError::not_authenticated("Invalid email or password").into_anyhow();
        if brand.name != cx.tenant.name {
            return Err(denied());
        }

        let principal_brand = brand.name.clone();
        let admin = cx
            .session
            .find_one::<BrandAdmin, _>(|a| a.brand_name == principal_brand && a.email.eq_ignore_ascii_case(&email))
            .await?;
        let admin = match admin {
            Some(a) if a.is_active && cx.state.passwords.verify(&password, &a.password) => a,
            _ => return Err(denied()),
        };

        let principal = Principal::admin(admin.id, brand.name.clone());
        cx.session.act_as(principal.clone())?;
        let tokens = cx.state.tokens.issue_pair(&principal)?;

        info!(admin = admin.id, brand = %brand.name, "brand admin logged in");
        Ok(ApiResponse::ok(
            "Login successful",
            json!({ "admin": admin.public(), "tokens": tokens }),
        ))
    }
}

/// `GET /admin/users`
pub struct AdminUsersEndpoint;

#[async_trait]
impl Endpoint for AdminUsersEndpoint {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let brand = cx.admin()?.brand_name.clone();
        let users = cx.session.find::<User, _>(|u| u.brand_name == brand).await?;
        let users: Vec<Value> = users.iter().map(User::public).collect();
        Ok(ApiResponse::ok("Users retrieved successfully", json!(users)))
    }
}

/// `PUT /admin/user/{userid}`
pub struct AdminUpdateUserEndpoint;

#[async_trait]
impl Endpoint for AdminUpdateUserEndpoint {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let brand = cx.admin()?.brand_name.clone();
        let userid = cx.req.path_id("userid")?;
        let patch: PatchUser = validate(&cx.req.body, USER_PATCH_ERROR)?;

        let mut user = cx
            .session
            .get::<User>(userid)
            .await?
            .filter(|u| u.brand_name == brand)
            .ok_or_else(|| HubError::not_found("User not found").into_anyhow())?;
        patch.apply(&mut user);
        cx.session.update(&mut user).await?;

        Ok(ApiResponse::ok("User updated successfully", user.public()))
    }
}

/// `DELETE /admin/user/{userid}`
pub struct AdminDeleteUserEndpoint;

#[async_trait]
impl Endpoint for AdminDeleteUserEndpoint {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let brand = cx.admin()?.brand_name.clone();
        let userid = cx.req.path_id("userid")?;

        let exists = cx
            .session
            .get::<User>(userid)
            .await?
            .is_some_and(|u| u.brand_name == brand);
        if !exists {
            return Err(HubError::not_found("User not found").into_anyhow());
        }

        let tasks = cx.session.delete_where::<Task, _>(|t| t.userid == userid).await?;
        cx.session.delete::<User>(userid).await?;

        info!(userid, tasks, "user deleted by brand admin");
        Ok(ApiResponse::ok(
            "User deleted successfully",
            json!({ "userid": userid, "tasks_deleted": tasks }),
        ))
    }
}

/// `GET /admin/contacts`
pub struct AdminContactsEndpoint;

#[async_trait]
impl Endpoint for AdminContactsEndpoint {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let brand = cx.admin()?.brand_name.clone();
        let contacts = cx
            .session
            .find::<ContactRequest, _>(|c| c.brand_name == brand)
            .await?;
        Ok(ApiResponse::ok(
            "Contact requests retrieved successfully",
            serde_json::to_value(&contacts)?,
        ))
    }
}

/// `PUT /admin/contact/{contact_id}`
pub struct AdminModifyContactEndpoint;

#[async_trait]
impl Endpoint for AdminModifyContactEndpoint {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let (admin_id, brand) = {
            let admin = cx.admin()?;
            (admin.id, admin.brand_name.clone())
        };
        let contact_id = cx.req.path_id("contact_id")?;
        let patch: PatchContact = validate(&cx.req.body, CONTACT_PATCH_ERROR)?;

        let mut contact = cx
            .session
            .get::<ContactRequest>(contact_id)
            .await?
            .filter(|c| c.brand_name == brand)
            .ok_or_else(|| HubError::not_found("Contact request not found").into_anyhow())?;

        if contact.approved_by.is_some_and(|by| by != admin_id) {
            return Err(
                HubError::bad_request("This contact request was approved by another administrator").into_anyhow(),
            );
        }

        patch.apply(&mut contact, admin_id);
        cx.session.update(&mut contact).await?;

        Ok(ApiResponse::ok(
            "Contact request updated successfully",
            serde_json::to_value(&contact)?,
        ))
    }
}
