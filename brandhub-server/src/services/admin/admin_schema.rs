use brandhub_store::{ContactRequest, User};
use serde::Deserialize;
use validator::Validate;

use crate::utils::validation::{trimmed, trimmed_opt};

pub const ADMIN_REGISTER_ERROR: &str = "All fields (email, password, firstname, surname) are required";
pub const USER_PATCH_ERROR: &str = "Invalid user data";
pub const CONTACT_PATCH_ERROR: &str = "Invalid contact request data";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterAdmin {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        length(min = 1, max = 50, message = "email is required"),
        email(message = "Enter a valid email address")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 50, message = "firstname is required"))]
    pub firstname: String,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 50, message = "surname is required"))]
    pub surname: String,
}

/// Fields an administrator may change on a user.
#[derive(Debug, Deserialize, Validate)]
pub struct PatchUser {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 50))]
    pub firstname: Option<String>,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 50))]
    pub surname: Option<String>,

    pub is_active: Option<bool>,
    pub number_task: Option<u32>,
    pub valid_user: Option<bool>,
}

impl PatchUser {
    pub fn apply(self, user: &mut User) {
        if let Some(v) = self.firstname {
            user.firstname = v;
        }
        if let Some(v) = self.surname {
            user.surname = v;
        }
        if let Some(v) = self.is_active {
            user.is_active = v;
        }
        if let Some(v) = self.number_task {
            user.number_task = v;
        }
        if let Some(v) = self.valid_user {
            user.valid_user = v;
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PatchContact {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 200))]
    pub subject: Option<String>,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1))]
    pub message: Option<String>,

    pub approved: Option<bool>,
}

impl PatchContact {
    /// Apply on behalf of administrator `admin_id`. Approving records the
    /// approver; withdrawing approval clears it.
    pub fn apply(self, contact: &mut ContactRequest, admin_id: u64) {
        if let Some(v) = self.subject {
            contact.subject = v;
        }
        if let Some(v) = self.message {
            contact.message = v;
        }
        if let Some(approved) = self.approved {
            contact.approved = approved;
            contact.approved_by = approved.then_some(admin_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandhub_core::TenantName;

    fn contact() -> ContactRequest {
        ContactRequest {
            id: 1,
            userid: 7,
            brand_name: TenantName::new("branda"),
            subject: "Hello".into(),
            message: "World".into(),
            approved: false,
            approved_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn approval_records_and_clears_the_approver() {
        let mut c = contact();
        PatchContact { subject: None, message: None, approved: Some(true) }.apply(&mut c, 3);
        assert!(c.approved);
        assert_eq!(c.approved_by, Some(3));

        PatchContact { subject: Some("Re".into()), message: None, approved: Some(false) }.apply(&mut c, 3);
        assert!(!c.approved);
        assert_eq!(c.approved_by, None);
        assert_eq!(c.subject, "Re");
    }

    #[test]
    fn user_patch_only_touches_given_fields() {
        let mut u = User::new("Ada", "L", "a@x.com", "h", TenantName::new("branda"));
        PatchUser {
            firstname: None,
            surname: None,
            is_active: None,
            number_task: Some(5),
            valid_user: Some(true),
        }
        .apply(&mut u);
        assert_eq!(u.firstname, "Ada");
        assert_eq!(u.number_task, 5);
        assert!(u.valid_user && u.is_active);
    }
}
