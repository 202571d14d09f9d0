use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use brandhub_core::{context, HubError, Principal, Tenant, TenantName};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::memory::TenantStore;
use crate::record::{Record, Scope};
use crate::session::Session;

/// Routes data access to the store of the tenant bound to the current task.
pub struct TenantGateway {
    stores: RwLock<HashMap<TenantName, Arc<TenantStore>>>,
    default_store: Arc<TenantStore>,
}

impl TenantGateway {
    pub fn new() -> Self {
        let default = Tenant::default_tenant();
        Self {
            stores: RwLock::new(HashMap::new()),
            default_store: Arc::new(TenantStore::new(default.name, default.store)),
        }
    }

    /// Make a tenant's physical store available. Attaching twice is a no-op.
    pub fn attach(&self, tenant: &Tenant) -> Arc<TenantStore> {
        if tenant.name.is_default() {
            return Arc::clone(&self.default_store);
        }
        let mut stores = self.stores.write();
        let store = stores.entry(tenant.name.clone()).or_insert_with(|| {
            info!(tenant = %tenant.name, store = ?tenant.store, "store attached");
            Arc::new(TenantStore::new(tenant.name.clone(), tenant.store.clone()))
        });
        Arc::clone(store)
    }

    pub fn for_tenant(&self, tenant: &TenantName) -> Result<Arc<TenantStore>> {
        if tenant.is_default() {
            return Ok(Arc::clone(&self.default_store));
        }
        self.stores
            .read()
            .get(tenant)
            .cloned()
            .ok_or_else(|| HubError::not_found(format!("No store for brand '{tenant}'")).into_anyhow())
    }

    pub fn default_store(&self) -> Arc<TenantStore> {
        Arc::clone(&self.default_store)
    }

    /// Start a session on the current task's tenant.
    ///
    /// Fails outside a tenant scope, and with Forbidden when `acting` belongs
    /// to another tenant.
    pub async fn begin(&self, acting: Option<Principal>) -> Result<Session> {
        let tenant = context::current()?;
        let store = self.for_tenant(&tenant)?;
        debug!(tenant = %tenant, "session begin");
        Session::open(tenant, acting, store, Arc::clone(&self.default_store))
    }

    /// Committed row count of `R` for `tenant`, honoring its scope.
    pub async fn row_count<R: Record>(&self, tenant: &TenantName) -> Result<usize> {
        let store = match R::SCOPE {
            Scope::Global => self.default_store(),
            Scope::Tenant => self.for_tenant(tenant)?,
        };
        Ok(store.row_count(R::TABLE).await)
    }
}

impl Default for TenantGateway {
    fn default() -> Self {
        Self::new()
    }
}
