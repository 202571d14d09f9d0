use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tenant::TenantName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    #[default]
    User,
    Admin,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => f.write_str("user"),
            PrincipalKind::Admin => f.write_str("admin"),
        }
    }
}

/// An authenticated actor, as established by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: u64,
    pub tenant: TenantName,
    pub kind: PrincipalKind,
}

impl Principal {
    pub fn user(id: u64, tenant: impl Into<TenantName>) -> Self {
        Self {
            id,
            tenant: tenant.into(),
            kind: PrincipalKind::User,
        }
    }

    pub fn admin(id: u64, tenant: impl Into<TenantName>) -> Self {
        Self {
            id,
            tenant: tenant.into(),
            kind: PrincipalKind::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.kind == PrincipalKind::Admin
    }
}
