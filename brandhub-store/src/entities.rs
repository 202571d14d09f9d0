//! Persisted entities.
//!
//! Password hashes are stored but never serialized into API payloads; use the
//! `public` views for that.

use brandhub_core::TenantName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::record::{Record, Scope};

/// An end user of one brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub userid: u64,
    pub firstname: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub brand_name: TenantName,
    #[serde(default = "yes")]
    pub is_active: bool,
    /// Maximum number of tasks this user may hold.
    #[serde(default)]
    pub number_task: u32,
    /// Approved by a brand administrator.
    #[serde(default)]
    pub valid_user: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        firstname: impl Into<String>,
        surname: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        brand_name: TenantName,
    ) -> Self {
        Self {
            userid: 0,
            firstname: firstname.into(),
            surname: surname.into(),
            email: email.into(),
            password: password_hash.into(),
            brand_name,
            is_active: true,
            number_task: 0,
            valid_user: false,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn public(&self) -> Value {
        json!({
            "userid": self.userid,
            "firstname": self.firstname,
            "surname": self.surname,
            "email": self.email,
            "brand_name": self.brand_name,
            "is_active": self.is_active,
            "number_task": self.number_task,
            "valid_user": self.valid_user,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}

impl Record for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> u64 {
        self.userid
    }

    fn set_id(&mut self, id: u64) {
        self.userid = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.email.to_lowercase(), self.brand_name))
    }

    fn touch(&mut self, now: DateTime<Utc>, is_new: bool) {
        if is_new {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }
}

/// A saved search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: u64,
    pub userid: u64,
    pub saved_search: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub postcode: Option<String>,
    pub radius: Option<i64>,
    #[serde(default = "yes")]
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(userid: u64, saved_search: impl Into<String>) -> Self {
        Self {
            id: 0,
            userid,
            saved_search: saved_search.into(),
            min_price: None,
            max_price: None,
            postcode: None,
            radius: None,
            active: true,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Record for Task {
    const TABLE: &'static str = "tasks";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.userid, self.saved_search))
    }

    fn touch(&mut self, now: DateTime<Utc>, is_new: bool) {
        if is_new {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub id: u64,
    pub userid: u64,
    pub brand_name: TenantName,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub approved: bool,
    /// Id of the administrator who approved it.
    pub approved_by: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for ContactRequest {
    const TABLE: &'static str = "contact_requests";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn touch(&mut self, now: DateTime<Utc>, is_new: bool) {
        if is_new {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }
}

/// An administrator scoped to one brand.
///
/// Stored in the default store next to the registry, whatever brand it
/// administers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandAdmin {
    #[serde(default)]
    pub id: u64,
    pub firstname: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub brand_name: TenantName,
    /// Set by an operator; new administrators start inactive.
    #[serde(default)]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BrandAdmin {
    pub fn public(&self) -> Value {
        json!({
            "id": self.id,
            "firstname": self.firstname,
            "surname": self.surname,
            "email": self.email,
            "brand_name": self.brand_name,
            "is_active": self.is_active,
        })
    }
}

impl Record for BrandAdmin {
    const TABLE: &'static str = "brand_admins";
    const SCOPE: Scope = Scope::Global;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.email.to_lowercase(), self.brand_name))
    }

    fn touch(&mut self, now: DateTime<Utc>, is_new: bool) {
        if is_new {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }
}

fn yes() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_view_hides_the_hash() {
        let u = User::new("Ada", "L", "a@x.com", "$2b$hash", TenantName::new("branda"));
        let v = u.public();
        assert!(v.get("password").is_none());
        assert_eq!(v["brand_name"], "branda");
    }

    #[test]
    fn unique_keys_ignore_email_case() {
        let a = User::new("A", "B", "A@X.com", "h", TenantName::new("branda"));
        let b = User::new("A", "B", "a@x.com", "h", TenantName::new("branda"));
        let c = User::new("A", "B", "a@x.com", "h", TenantName::new("brandb"));
        assert_eq!(a.unique_key(), b.unique_key());
        assert_ne!(a.unique_key(), c.unique_key());
    }
}
