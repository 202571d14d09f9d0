use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use brandhub_core::{context, HubError, Principal, TenantName};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::memory::{Row, Table, Tables, TenantStore};
use crate::record::{Record, Scope};

/// A staged change to one row.
struct Pending {
    /// Committed version the change was made against; `None` for rows
    /// created in this session.
    base: Option<u64>,
    /// Unique key of the committed row, released on commit.
    old_key: Option<String>,
    /// New document and its unique key. `None` deletes the row.
    new: Option<(Value, Option<String>)>,
}

type Staged = BTreeMap<u64, Pending>;

/// Re-evaluated against the merged table at commit.
type Check = Box<dyn Fn(&Table, &Staged) -> Result<()> + Send + Sync>;

/// One store's share of a session: staged writes plus commit-time checks.
struct Txn {
    store: Arc<TenantStore>,
    staged: HashMap<&'static str, Staged>,
    /// Version of each committed row when this session first read it.
    seen: HashMap<(&'static str, u64), u64>,
    checks: Vec<(&'static str, Check)>,
}

impl Txn {
    fn new(store: Arc<TenantStore>) -> Self {
        Self {
            store,
            staged: HashMap::new(),
            seen: HashMap::new(),
            checks: Vec::new(),
        }
    }

    fn pending(&self, table: &str, id: u64) -> Option<&Pending> {
        self.staged.get(table).and_then(|s| s.get(&id))
    }

    fn committed(&mut self, table: &'static str, id: u64) -> Option<Row> {
        let row = self.store.lock().get(table).and_then(|t| t.rows.get(&id)).cloned();
        if let Some(r) = &row {
            self.seen.entry((table, id)).or_insert(r.version);
        }
        row
    }

    /// The row as this session sees it.
    fn current(&mut self, table: &'static str, id: u64) -> Option<Value> {
        match self.pending(table, id) {
            Some(p) => p.new.as_ref().map(|(v, _)| v.clone()),
            None => self.committed(table, id).map(|r| r.value),
        }
    }

    /// Every visible row of `table`, in id order.
    fn rows(&mut self, table: &'static str) -> Vec<Value> {
        let staged = self.staged.get(table);
        let mut merged = BTreeMap::new();
        if let Some(t) = self.store.lock().get(table) {
            for (id, row) in &t.rows {
                if staged.is_some_and(|s| s.contains_key(id)) {
                    continue;
                }
                self.seen.entry((table, *id)).or_insert(row.version);
                merged.insert(*id, row.value.clone());
            }
        }
        if let Some(s) = staged {
            for (id, p) in s {
                if let Some((v, _)) = &p.new {
                    merged.insert(*id, v.clone());
                }
            }
        }
        merged.into_values().collect()
    }

    /// Base version and committed unique key of a row that currently exists.
    ///
    /// The base is the version first read by this session, so a commit made
    /// by someone else between that read and this write is still caught.
    fn base_of<R: Record>(&mut self, id: u64) -> Result<Option<(Option<u64>, Option<String>)>> {
        if let Some(p) = self.pending(R::TABLE, id) {
            return Ok(p.new.as_ref().map(|_| (p.base, p.old_key.clone())));
        }
        match self.committed(R::TABLE, id) {
            Some(row) => {
                let base = self.seen.get(&(R::TABLE, id)).copied().unwrap_or(row.version);
                let record: R = serde_json::from_value(row.value)?;
                Ok(Some((Some(base), record.unique_key())))
            }
            None => Ok(None),
        }
    }

    /// Whether `key` belongs to a row other than `id`, as this session sees it.
    fn key_taken(&self, table: &str, key: &str, id: u64) -> bool {
        let staged = self.staged.get(table);
        let in_session = staged.is_some_and(|s| {
            s.iter().any(|(other, p)| {
                *other != id && p.new.as_ref().and_then(|(_, k)| k.as_deref()) == Some(key)
            })
        });
        if in_session {
            return true;
        }
        let owner = self.store.lock().get(table).and_then(|t| t.unique.get(key).copied());
        owner.is_some_and(|o| o != id && !staged.is_some_and(|s| s.contains_key(&o)))
    }

    fn stage(
        &mut self,
        table: &'static str,
        id: u64,
        base: Option<u64>,
        old_key: Option<String>,
        new: Option<(Value, Option<String>)>,
    ) {
        self.staged
            .entry(table)
            .or_default()
            .entry(id)
            .or_insert(Pending { base, old_key, new: None })
            .new = new;
    }

    /// Conflict, uniqueness and registered checks against the committed
    /// tables. Runs under the store lock.
    fn validate(&self, tables: &Tables) -> Result<()> {
        let empty_table = Table::default();
        let empty_staged = Staged::new();

        for (name, staged) in &self.staged {
            let table = tables.get(name).unwrap_or(&empty_table);
            for (id, p) in staged {
                if table.rows.get(id).map(|r| r.version) != p.base {
                    warn!(store = %self.store.name(), table = name, id, "write conflict");
                    return Err(HubError::conflict("Record was changed by another request, please retry").into_anyhow());
                }
                let Some((_, Some(key))) = &p.new else {
                    continue;
                };
                if let Some(owner) = table.unique.get(key) {
                    let released = *owner == *id
                        || staged
                            .get(owner)
                            .is_some_and(|o| o.new.as_ref().and_then(|(_, k)| k.as_ref()) != Some(key));
                    if !released {
                        return Err(duplicate(name));
                    }
                }
            }
        }

        for (name, check) in &self.checks {
            let table = tables.get(name).unwrap_or(&empty_table);
            check(table, self.staged.get(name).unwrap_or(&empty_staged))?;
        }
        Ok(())
    }

    fn apply(self, tables: &mut Tables) {
        let mut writes = 0;
        for (name, staged) in self.staged {
            let table = tables.entry(name).or_default();
            for (id, p) in &staged {
                if let Some(k) = &p.old_key {
                    if table.unique.get(k) == Some(id) {
                        table.unique.remove(k);
                    }
                }
            }
            for (id, p) in staged {
                writes += 1;
                match p.new {
                    Some((value, key)) => {
                        let version = p.base.map_or(1, |v| v + 1);
                        table.rows.insert(id, Row { version, value });
                        if let Some(k) = key {
                            table.unique.insert(k, id);
                        }
                    }
                    None => {
                        table.rows.remove(&id);
                    }
                }
            }
        }
        debug!(store = %self.store.name(), rows = writes, "committed");
    }
}

/// A transaction against one tenant's store.
///
/// Every operation first checks that the task is still bound to the session's
/// tenant and that the acting principal belongs to it. Global-scope records
/// are routed to the default store.
///
/// Reads see committed data plus the session's own writes. Writes are staged
/// and applied together by [`Session::commit`], which refuses rows changed
/// by a concurrent commit and re-checks unique keys. Dropping a session
/// without committing discards its writes.
pub struct Session {
    tenant: TenantName,
    acting: Option<Principal>,
    primary: Txn,
    global: Option<Txn>,
    default_store: Arc<TenantStore>,
}

impl Session {
    pub(crate) fn open(
        tenant: TenantName,
        acting: Option<Principal>,
        store: Arc<TenantStore>,
        default_store: Arc<TenantStore>,
    ) -> Result<Self> {
        check_binding(&tenant, acting.as_ref())?;
        Ok(Self {
            tenant,
            acting,
            primary: Txn::new(store),
            global: None,
            default_store,
        })
    }

    pub fn tenant(&self) -> &TenantName {
        &self.tenant
    }

    pub fn acting(&self) -> Option<&Principal> {
        self.acting.as_ref()
    }

    /// Record the principal once it is known (login, registration).
    ///
    /// The principal must belong to the session's tenant.
    pub fn act_as(&mut self, principal: Principal) -> Result<()> {
        check_binding(&self.tenant, Some(&principal))?;
        self.acting = Some(principal);
        Ok(())
    }

    fn txn_for<R: Record>(&mut self) -> Result<&mut Txn> {
        check_binding(&self.tenant, self.acting.as_ref())?;

        if R::SCOPE == Scope::Tenant || self.tenant.is_default() {
            return Ok(&mut self.primary);
        }
        let default_store = &self.default_store;
        Ok(self.global.get_or_insert_with(|| Txn::new(Arc::clone(default_store))))
    }

    pub async fn insert<R: Record>(&mut self, mut record: R) -> Result<R> {
        let now = Utc::now();
        let txn = self.txn_for::<R>()?;

        let key = record.unique_key();
        if let Some(k) = &key {
            if txn.key_taken(R::TABLE, k, 0) {
                return Err(duplicate(R::TABLE));
            }
        }

        let id = txn.store.allocate_id(R::TABLE);
        record.set_id(id);
        record.touch(now, true);
        let value = serde_json::to_value(&record)?;
        txn.stage(R::TABLE, id, None, None, Some((value, key)));
        Ok(record)
    }

    pub async fn get<R: Record>(&mut self, id: u64) -> Result<Option<R>> {
        let txn = self.txn_for::<R>()?;
        match txn.current(R::TABLE, id) {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// All records matching `pred`, in insertion order.
    pub async fn find<R, F>(&mut self, pred: F) -> Result<Vec<R>>
    where
        R: Record,
        F: Fn(&R) -> bool,
    {
        let txn = self.txn_for::<R>()?;
        let mut out = Vec::new();
        for value in txn.rows(R::TABLE) {
            let record: R = serde_json::from_value(value)?;
            if pred(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    pub async fn find_one<R, F>(&mut self, pred: F) -> Result<Option<R>>
    where
        R: Record,
        F: Fn(&R) -> bool,
    {
        Ok(self.find(pred).await?.into_iter().next())
    }

    pub async fn count<R, F>(&mut self, pred: F) -> Result<usize>
    where
        R: Record,
        F: Fn(&R) -> bool,
    {
        Ok(self.find(pred).await?.len())
    }

    /// Replace a stored record; unknown ids are a 404.
    pub async fn update<R: Record>(&mut self, record: &mut R) -> Result<()> {
        let now = Utc::now();
        let id = record.id();
        let txn = self.txn_for::<R>()?;

        let Some((base, old_key)) = txn.base_of::<R>(id)? else {
            return Err(HubError::not_found("Record not found").into_anyhow());
        };
        let new_key = record.unique_key();
        if let Some(k) = &new_key {
            if txn.key_taken(R::TABLE, k, id) {
                return Err(duplicate(R::TABLE));
            }
        }

        record.touch(now, false);
        let value = serde_json::to_value(&*record)?;
        txn.stage(R::TABLE, id, base, old_key, Some((value, new_key)));
        Ok(())
    }

    pub async fn delete<R: Record>(&mut self, id: u64) -> Result<Option<R>> {
        let txn = self.txn_for::<R>()?;
        let Some((base, old_key)) = txn.base_of::<R>(id)? else {
            return Ok(None);
        };
        let record: Option<R> = match txn.current(R::TABLE, id) {
            Some(v) => Some(serde_json::from_value(v)?),
            None => None,
        };
        txn.stage(R::TABLE, id, base, old_key, None);
        Ok(record)
    }

    /// Delete every record matching `pred`; returns how many went.
    pub async fn delete_where<R, F>(&mut self, pred: F) -> Result<usize>
    where
        R: Record,
        F: Fn(&R) -> bool,
    {
        let doomed: Vec<u64> = self.find::<R, _>(pred).await?.iter().map(|r| r.id()).collect();
        for id in &doomed {
            self.delete::<R>(*id).await?;
        }
        Ok(doomed.len())
    }

    /// Refuse the commit if more than `max` records match `pred` once this
    /// session's writes are applied on top of the latest committed data.
    ///
    /// Guards limits that concurrent sessions could otherwise overrun
    /// between a count and the insert that follows it.
    pub fn limit<R, F>(&mut self, max: usize, message: &'static str, pred: F) -> Result<()>
    where
        R: Record,
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        let check: Check = Box::new(move |table: &Table, staged: &Staged| {
            let mut matching = 0;
            for (id, row) in &table.rows {
                if staged.contains_key(id) {
                    continue;
                }
                let record: R = serde_json::from_value(row.value.clone())?;
                if pred(&record) {
                    matching += 1;
                }
            }
            for p in staged.values() {
                if let Some((v, _)) = &p.new {
                    let record: R = serde_json::from_value(v.clone())?;
                    if pred(&record) {
                        matching += 1;
                    }
                }
            }
            if matching > max {
                return Err(HubError::bad_request(message).into_anyhow());
            }
            Ok(())
        });
        self.txn_for::<R>()?.checks.push((R::TABLE, check));
        Ok(())
    }

    /// Make every write visible at once.
    ///
    /// The tenant store is locked before the default store, and only for the
    /// length of the checks and the write-back.
    pub fn commit(self) -> Result<()> {
        check_binding(&self.tenant, self.acting.as_ref())?;
        let Session { primary, global, tenant, .. } = self;

        let primary_store = Arc::clone(&primary.store);
        let mut primary_tables = primary_store.lock();
        match global {
            None => {
                primary.validate(&primary_tables)?;
                primary.apply(&mut primary_tables);
            }
            Some(global) => {
                let global_store = Arc::clone(&global.store);
                let mut global_tables = global_store.lock();
                primary.validate(&primary_tables)?;
                global.validate(&global_tables)?;
                primary.apply(&mut primary_tables);
                global.apply(&mut global_tables);
            }
        }
        debug!(tenant = %tenant, "session committed");
        Ok(())
    }

    /// Discard every write. Dropping the session has the same effect.
    pub fn rollback(self) {
        debug!(tenant = %self.tenant, "rolled back");
    }
}

/// The cross-tenant guard.
fn check_binding(tenant: &TenantName, acting: Option<&Principal>) -> Result<()> {
    let current = context::current()?;
    if &current != tenant {
        warn!(session = %tenant, context = %current, "session used under another tenant context");
        return Err(HubError::forbidden("Access denied").into_anyhow());
    }
    if let Some(p) = acting {
        if &p.tenant != tenant {
            warn!(session = %tenant, principal_tenant = %p.tenant, "principal from another tenant");
            return Err(HubError::forbidden("Access denied").into_anyhow());
        }
    }
    Ok(())
}

fn duplicate(table: &str) -> anyhow::Error {
    HubError::conflict(format!("Duplicate entry in {table}")).into_anyhow()
}
