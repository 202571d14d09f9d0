//! In-memory reference engine.
//!
//! One [`TenantStore`] per physical store. A store's tables sit behind a
//! mutex that is only taken for short critical sections: sessions copy out
//! what they read and hand their staged writes back at commit. The lock is
//! never held across an await.
//!
//! Every row carries a version so a commit can tell whether a row it changed
//! was committed by someone else in the meantime.

use std::collections::{BTreeMap, HashMap};

use brandhub_core::{StoreCoordinates, TenantName};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;

#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub version: u64,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub next_id: u64,
    pub rows: BTreeMap<u64, Row>,
    /// unique key -> row id
    pub unique: HashMap<String, u64>,
}

impl Table {
    pub fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub(crate) type Tables = HashMap<&'static str, Table>;

/// A tenant's physical store.
pub struct TenantStore {
    name: TenantName,
    coordinates: StoreCoordinates,
    tables: Mutex<Tables>,
}

impl TenantStore {
    pub fn new(name: TenantName, coordinates: StoreCoordinates) -> Self {
        Self {
            name,
            coordinates,
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &TenantName {
        &self.name
    }

    pub fn coordinates(&self) -> &StoreCoordinates {
        &self.coordinates
    }

    /// Brief exclusive access. Callers must not await while holding it.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock()
    }

    /// Ids are handed out at insert time; a rolled-back insert leaves a gap.
    pub(crate) fn allocate_id(&self, table: &'static str) -> u64 {
        self.lock().entry(table).or_default().allocate_id()
    }

    /// Committed rows in `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        self.lock().get(table).map(|t| t.rows.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for TenantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantStore")
            .field("name", &self.name)
            .field("coordinates", &self.coordinates)
            .finish()
    }
}
