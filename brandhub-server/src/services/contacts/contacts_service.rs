use anyhow::Result;
use async_trait::async_trait;
use brandhub_core::ApiResponse;
use brandhub_store::ContactRequest;
use tracing::info;

use super::contacts_schema::{ContactForm, CONTACT_ERROR};
use crate::pipeline::{Access, Endpoint, RequestCx};
use crate::services::current_user;
use crate::utils::validation::validate;

/// `POST /contact-us`
pub struct ContactUsEndpoint;

#[async_trait]
impl Endpoint for ContactUsEndpoint {
    fn access(&self) -> Access {
        Access::User
    }

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse> {
        let user = current_user(cx).await?;
        let form: ContactForm = validate(&cx.req.body, CONTACT_ERROR)?;

        let contact = cx
            .session
            .insert(ContactRequest {
                id: 0,
                userid: user.userid,
                brand_name: cx.tenant.name.clone(),
                subject: form.subject,
                message: form.message,
                approved: false,
                approved_by: None,
                created_at: None,
                updated_at: None,
            })
            .await?;

        info!(contact = contact.id, userid = user.userid, "contact request recorded");
        Ok(ApiResponse::created(
            "Contact Us form submitted successfully",
            serde_json::to_value(&contact)?,
        ))
    }
}
