//! Core multi-tenant types for brandhub.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The tenant that is always resolvable, with or without a registry entry.
///
/// Registry-level entities (brand administrators, the brand list itself) live
/// in this tenant's store.
pub const DEFAULT_TENANT: &str = "default";

/// A normalized tenant (brand) name.
///
/// Names are trimmed and lowercased on construction so a header value and a
/// registry key for the same brand always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TenantName(String);

impl TenantName {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn default_tenant() -> Self {
        Self(DEFAULT_TENANT.to_string())
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_TENANT
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TenantName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for TenantName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<TenantName> for String {
    fn from(value: TenantName) -> Self {
        value.0
    }
}

impl AsRef<str> for TenantName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TenantName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TenantName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Where a tenant's physical store lives.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCoordinates {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    /// Logical database name.
    pub database: String,
}

impl StoreCoordinates {
    pub fn local(database: impl Into<String>) -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: None,
            database: database.into(),
        }
    }
}

// Hand-written so credentials never end up in logs.
impl fmt::Debug for StoreCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCoordinates")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}

/// A known brand and its connection coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: u64,
    pub name: TenantName,
    pub store: StoreCoordinates,
    pub active: bool,
}

impl Tenant {
    pub fn new(id: u64, name: impl Into<TenantName>, store: StoreCoordinates) -> Self {
        Self {
            id,
            name: name.into(),
            store,
            active: true,
        }
    }

    /// The synthesized entry used when "default" has no registry row.
    pub fn default_tenant() -> Self {
        Self::new(0, TenantName::default_tenant(), StoreCoordinates::local(DEFAULT_TENANT))
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Context carried with every request.
///
/// Lives for exactly one request; see [`crate::context`] for how it is bound
/// to the task that processes the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant: TenantName,
}

impl TenantContext {
    pub fn new<S: Into<TenantName>>(tenant: S) -> Self {
        Self {
            tenant: tenant.into(),
        }
    }

    pub fn default_tenant() -> Self {
        Self::new(TenantName::default_tenant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized() {
        assert_eq!(TenantName::new("  BrandA "), TenantName::new("branda"));
        assert_eq!(TenantName::new("DEFAULT"), "default");
        assert!(TenantName::new("Default").is_default());
    }

    #[test]
    fn debug_output_redacts_store_password() {
        let mut coords = StoreCoordinates::local("brand_a");
        coords.password = Some("hunter2".to_string());
        let out = format!("{coords:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("***"));
    }

    #[test]
    fn tenant_name_serializes_as_plain_string() {
        let v = serde_json::to_value(TenantName::new("BrandB")).unwrap();
        assert_eq!(v, serde_json::json!("brandb"));
        let back: TenantName = serde_json::from_value(serde_json::json!(" BRANDB")).unwrap();
        assert_eq!(back, "brandb");
    }
}
