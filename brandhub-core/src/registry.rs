use std::collections::HashMap;

use anyhow::Result;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::{ConfigError, HubConfigSnapshot};
use crate::errors::HubError;
use crate::tenant::{StoreCoordinates, Tenant, TenantName};

/// The authoritative list of brands and where their data lives.
///
/// Reads take a shared lock and never block each other. Registration and
/// activation are operator actions and take the write lock briefly.
pub struct TenantRegistry {
    tenants: RwLock<HashMap<TenantName, Tenant>>,
}

impl TenantRegistry {
    /// Create an empty registry. "default" still resolves.
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the registry from `tenants.<name>.<field>` keys.
    ///
    /// ```text
    /// tenants.branda.id = 1
    /// tenants.branda.host = db1.internal
    /// tenants.branda.database = brand_a
    /// tenants.branda.active = true
    /// ```
    ///
    /// `id` is required. `database` defaults to the tenant name and `active`
    /// to true.
    pub fn from_config(config: &HubConfigSnapshot) -> Result<Self> {
        let mut fields: HashMap<String, HashMap<String, String>> = HashMap::new();
        for (rest, value) in config.entries_with_prefix("tenants.") {
            if let Some((name, field)) = rest.split_once('.') {
                fields
                    .entry(name.to_string())
                    .or_default()
                    .insert(field.to_string(), value.to_string());
            }
        }

        let registry = Self::new();
        // Stable order so duplicate-id errors are reproducible.
        let mut names: Vec<_> = fields.keys().cloned().collect();
        names.sort();

        for name in names {
            let f = &fields[&name];
            let key = |field: &str| format!("tenants.{name}.{field}");
            let parse_err = |field: &str, reason: String| ConfigError::Invalid {
                key: key(field),
                reason,
            };

            let id = f
                .get("id")
                .ok_or_else(|| ConfigError::Missing(key("id")))?
                .trim()
                .parse::<u64>()
                .map_err(|e| parse_err("id", e.to_string()))?;
            let port = match f.get("port") {
                Some(p) => p
                    .trim()
                    .parse::<u16>()
                    .map_err(|e| parse_err("port", e.to_string()))?,
                None => 3306,
            };
            let active = match f.get("active") {
                Some(a) => a
                    .trim()
                    .parse::<bool>()
                    .map_err(|e| parse_err("active", e.to_string()))?,
                None => true,
            };

            let store = StoreCoordinates {
                host: f.get("host").cloned().unwrap_or_else(|| "localhost".to_string()),
                port,
                user: f.get("user").cloned().unwrap_or_default(),
                password: f.get("password").cloned(),
                database: f.get("database").cloned().unwrap_or_else(|| name.clone()),
            };
            let mut tenant = Tenant::new(id, name.as_str(), store);
            tenant.active = active;
            registry.register(tenant)?;
        }

        Ok(registry)
    }

    /// Add a tenant. Names and ids are both unique.
    pub fn register(&self, tenant: Tenant) -> Result<()> {
        if tenant.name.is_empty() {
            return Err(HubError::bad_request("Tenant name must not be empty").into_anyhow());
        }

        let mut map = self.tenants.write();
        if map.contains_key(&tenant.name) {
            return Err(
                HubError::conflict(format!("Tenant '{}' already exists", tenant.name)).into_anyhow(),
            );
        }
        if map.values().any(|t| t.id == tenant.id) {
            return Err(
                HubError::conflict(format!("Tenant id {} is already taken", tenant.id)).into_anyhow(),
            );
        }

        info!(tenant = %tenant.name, id = tenant.id, active = tenant.active, "tenant registered");
        map.insert(tenant.name.clone(), tenant);
        Ok(())
    }

    pub fn set_active(&self, name: &TenantName, active: bool) -> Result<()> {
        let mut map = self.tenants.write();
        match map.get_mut(name) {
            Some(t) => {
                t.active = active;
                info!(tenant = %name, active, "tenant activation changed");
                Ok(())
            }
            None => Err(HubError::not_found(format!("Unknown tenant '{name}'")).into_anyhow()),
        }
    }

    /// Look up an active tenant by name.
    ///
    /// "default" always resolves, using its registry row when one exists.
    pub fn resolve(&self, candidate: &str) -> Result<Tenant> {
        let name = TenantName::new(candidate);
        let map = self.tenants.read();

        if name.is_default() {
            return Ok(map.get(&name).cloned().unwrap_or_else(Tenant::default_tenant));
        }

        match map.get(&name) {
            Some(t) if t.active => Ok(t.clone()),
            _ => {
                debug!(candidate, "tenant did not resolve");
                Err(HubError::not_found("Unknown brand").into_anyhow())
            }
        }
    }

    /// Active tenant by numeric id.
    pub fn by_id(&self, id: u64) -> Option<Tenant> {
        self.tenants
            .read()
            .values()
            .find(|t| t.id == id && t.active)
            .cloned()
    }

    /// Every registered tenant, ordered by id.
    pub fn list(&self) -> Vec<Tenant> {
        let mut all: Vec<_> = self.tenants.read().values().cloned().collect();
        all.sort_by_key(|t| t.id);
        all
    }
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::errors::ErrorKind;
    use std::sync::Arc;

    fn registry() -> TenantRegistry {
        let r = TenantRegistry::new();
        r.register(Tenant::new(1, "brandA", StoreCoordinates::local("brand_a"))).unwrap();
        r.register(Tenant::new(2, "brandB", StoreCoordinates::local("brand_b")).inactive())
            .unwrap();
        r
    }

    #[test]
    fn resolve_only_returns_active_tenants() {
        let r = registry();
        assert_eq!(r.resolve("BRANDA").unwrap().id, 1);

        let err = r.resolve("brandb").unwrap_err();
        assert_eq!(HubError::kind_of(&err), Some(ErrorKind::NotFound));
        let err = r.resolve("nobody").unwrap_err();
        assert_eq!(HubError::kind_of(&err), Some(ErrorKind::NotFound));

        r.set_active(&TenantName::new("brandb"), true).unwrap();
        assert_eq!(r.resolve("brandb").unwrap().id, 2);
    }

    #[test]
    fn default_resolves_without_a_row() {
        let r = TenantRegistry::new();
        let t = r.resolve("default").unwrap();
        assert!(t.name.is_default());
        assert!(t.active);
    }

    #[test]
    fn duplicate_names_and_ids_conflict() {
        let r = registry();
        let err = r
            .register(Tenant::new(9, "branda", StoreCoordinates::local("x")))
            .unwrap_err();
        assert_eq!(HubError::kind_of(&err), Some(ErrorKind::Conflict));
        let err = r
            .register(Tenant::new(1, "brandc", StoreCoordinates::local("x")))
            .unwrap_err();
        assert_eq!(HubError::kind_of(&err), Some(ErrorKind::Conflict));
    }

    #[test]
    fn by_id_skips_inactive_and_list_is_ordered() {
        let r = registry();
        assert!(r.by_id(1).is_some());
        assert!(r.by_id(2).is_none());
        let ids: Vec<u64> = r.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn seeds_from_config_keys() {
        let mut cfg = HubConfig::new();
        cfg.set("tenants.branda.id", "1");
        cfg.set("tenants.branda.host", "db1");
        cfg.set("tenants.branda.port", "5432");
        cfg.set("tenants.brandb.id", "2");
        cfg.set("tenants.brandb.active", "false");
        let r = TenantRegistry::from_config(&cfg.snapshot()).unwrap();

        let a = r.resolve("branda").unwrap();
        assert_eq!(a.store.host, "db1");
        assert_eq!(a.store.port, 5432);
        assert_eq!(a.store.database, "branda");
        assert!(r.resolve("brandb").is_err());
    }

    #[test]
    fn config_without_id_is_rejected() {
        let mut cfg = HubConfig::new();
        cfg.set("tenants.branda.host", "db1");
        let err = TenantRegistry::from_config(&cfg.snapshot()).err().unwrap();
        assert!(err.to_string().contains("tenants.branda.id"));
    }

    #[test]
    fn concurrent_readers_see_a_consistent_registry() {
        let r = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&r);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        assert_eq!(r.resolve("branda").unwrap().id, 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
