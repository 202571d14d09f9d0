use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use brandhub_auth::{AuthOptions, PasswordHasher, TokenIssuer};
use brandhub_core::{
    context, ConfigError, HubConfigSnapshot, HubError, Tenant, TenantContext, TenantRegistry,
};
use brandhub_store::{BrandAdmin, TenantGateway};
use tracing::info;

/// What to do with a tenant header that names no active brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownTenant {
    /// Continue as "default".
    Fallback,
    /// Answer NotFound.
    Reject,
}

impl FromStr for UnknownTenant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "reject" => Ok(Self::Reject),
            other => Err(format!("expected 'fallback' or 'reject', got '{other}'")),
        }
    }
}

/// Request-handling settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tenant_header: String,
    pub unknown_tenant: UnknownTenant,
    pub request_timeout: Duration,
    pub default_task_quota: u32,
    pub auto_validate: bool,
    pub page_size: usize,
    pub max_page_size: usize,
    pub expose_internal: bool,
}

impl Settings {
    pub fn from_config(config: &HubConfigSnapshot) -> Result<Self, ConfigError> {
        let page_size = config.parse::<usize>("tasks.page_size")?.unwrap_or(10);
        let max_page_size = config.parse::<usize>("tasks.max_page_size")?.unwrap_or(100);
        if page_size == 0 || page_size > max_page_size {
            return Err(ConfigError::Invalid {
                key: "tasks.page_size".to_string(),
                reason: format!("must be between 1 and {max_page_size}"),
            });
        }

        Ok(Self {
            tenant_header: config
                .get("tenancy.header")
                .unwrap_or("x-brand-name")
                .to_ascii_lowercase(),
            unknown_tenant: config
                .parse::<UnknownTenant>("tenancy.unknown")?
                .unwrap_or(UnknownTenant::Fallback),
            request_timeout: config
                .get_duration("request.timeout")?
                .unwrap_or(Duration::from_secs(10)),
            default_task_quota: config.parse::<u32>("users.default_task_quota")?.unwrap_or(0),
            auto_validate: config.parse::<bool>("users.auto_validate")?.unwrap_or(false),
            page_size,
            max_page_size,
            expose_internal: config.parse::<bool>("errors.expose_internal")?.unwrap_or(false),
        })
    }
}

/// Everything a request may touch, shared by all requests.
pub struct AppState {
    pub settings: Settings,
    pub registry: TenantRegistry,
    pub gateway: TenantGateway,
    pub tokens: TokenIssuer,
    pub passwords: PasswordHasher,
}

impl AppState {
    /// Build state from configuration, attaching a store for every
    /// `tenants.*` entry.
    pub fn from_config(config: &HubConfigSnapshot) -> Result<Self> {
        let auth = AuthOptions::from_config(config)?;
        let state = Self {
            settings: Settings::from_config(config)?,
            registry: TenantRegistry::from_config(config)?,
            gateway: TenantGateway::new(),
            tokens: TokenIssuer::new(auth.jwt),
            passwords: PasswordHasher::new(auth.hash_cost),
        };
        for tenant in state.registry.list() {
            state.gateway.attach(&tenant);
        }
        Ok(state)
    }

    /// Register a brand and attach its store.
    pub fn provision_tenant(&self, tenant: Tenant) -> Result<()> {
        self.registry.register(tenant.clone())?;
        self.gateway.attach(&tenant);
        Ok(())
    }

    /// Operator action: allow a brand administrator to log in.
    pub async fn activate_admin(&self, admin_id: u64) -> Result<BrandAdmin> {
        context::scope(TenantContext::default_tenant(), async {
            let mut session = self.gateway.begin(None).await?;
            let mut admin = session
                .get::<BrandAdmin>(admin_id)
                .await?
                .ok_or_else(|| HubError::not_found("Admin not found").into_anyhow())?;
            admin.is_active = true;
            session.update(&mut admin).await?;
            session.commit()?;
            info!(admin = admin.id, brand = %admin.brand_name, "brand admin activated");
            Ok(admin)
        })
        .await
    }
}
