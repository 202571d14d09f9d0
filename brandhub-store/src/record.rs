use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Which store a record type lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Partitioned per tenant; routed by the request's tenant.
    Tenant,
    /// Registry-level; always lives in the default store.
    Global,
}

/// A persisted entity.
///
/// Rows are kept as JSON documents, so any serde type with an id works.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    const SCOPE: Scope = Scope::Tenant;

    /// 0 until the record is first inserted.
    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);

    /// Natural key that must be unique within the table.
    fn unique_key(&self) -> Option<String> {
        None
    }

    /// Called on insert (`is_new`) and on every update.
    fn touch(&mut self, _now: DateTime<Utc>, _is_new: bool) {}
}
