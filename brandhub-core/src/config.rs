//! # brandhub configuration
//!
//! A flat string key/value store, in the spirit of `app.set()` /
//! `app.get()`. Layers are applied in order:
//!
//! 1. built-in defaults ([`DEFAULTS`])
//! 2. environment variables prefixed with [`ENV_PREFIX`]
//! 3. explicit `set` calls (tests, embedding applications)
//!
//! ```rust
//! use brandhub_core::HubConfig;
//! let mut cfg = HubConfig::with_defaults();
//! cfg.set("tasks.page_size", "25");
//!
//! let snap = cfg.snapshot();
//! assert_eq!(snap.get_usize("tasks.page_size"), Some(25));
//! ```
//!
//! Environment names map to keys by stripping the prefix, lowercasing and
//! turning `__` into `.`:
//!
//! ```bash
//! export BRANDHUB__AUTH__SECRET=change-me   # auth.secret
//! export BRANDHUB__TENANTS__BRANDA__HOST=db1 # tenants.branda.host
//! ```
//!
//! Request handling only ever reads a [`HubConfigSnapshot`], which is
//! immutable and cheap to share.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

pub const ENV_PREFIX: &str = "BRANDHUB__";

pub const DEFAULTS: &[(&str, &str)] = &[
    ("http.host", "127.0.0.1"),
    ("http.port", "3030"),
    ("auth.access_ttl", "15m"),
    ("auth.refresh_ttl", "7d"),
    ("auth.leeway_secs", "0"),
    ("auth.bcrypt_cost", "12"),
    ("tenancy.header", "x-brand-name"),
    ("tenancy.unknown", "fallback"),
    ("request.timeout", "10s"),
    ("users.default_task_quota", "0"),
    ("users.auto_validate", "false"),
    ("tasks.page_size", "10"),
    ("tasks.max_page_size", "100"),
    ("errors.expose_internal", "false"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration key `{0}`")]
    Missing(String),
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Default)]
pub struct HubConfig {
    values: HashMap<String, String>,
}

impl HubConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// A store pre-filled with [`DEFAULTS`].
    pub fn with_defaults() -> Self {
        let mut cfg = Self::new();
        for (k, v) in DEFAULTS {
            cfg.set(*k, *v);
        }
        cfg
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut cfg = Self::with_defaults();
        cfg.load_vars(ENV_PREFIX, std::env::vars());
        cfg
    }

    /// Overlay `PREFIX`-ed variables from any source.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                // BRANDHUB__AUTH__SECRET -> auth.secret
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> HubConfigSnapshot {
        HubConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct HubConfigSnapshot {
    map: HashMap<String, String>,
}

impl HubConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Parse a typed value, reporting which key was malformed.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::Invalid {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Durations use humantime syntax: `15m`, `7d`, `250ms`.
    pub fn get_duration(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => humantime::parse_duration(raw.trim())
                .map(Some)
                .map_err(|e| ConfigError::Invalid {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// All `(key, value)` pairs under `prefix`, with the prefix stripped.
    pub fn entries_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.map.iter().filter_map(move |(k, v)| {
            k.strip_prefix(prefix).map(|rest| (rest, v.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_overlay_defaults() {
        let mut cfg = HubConfig::with_defaults();
        cfg.load_vars(
            ENV_PREFIX,
            vec![
                ("BRANDHUB__AUTH__SECRET".to_string(), "s3cret".to_string()),
                ("BRANDHUB__TASKS__PAGE_SIZE".to_string(), "5".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );
        let snap = cfg.snapshot();
        assert_eq!(snap.get("auth.secret"), Some("s3cret"));
        assert_eq!(snap.get_usize("tasks.page_size"), Some(5));
        assert!(snap.get("unrelated").is_none());
    }

    #[test]
    fn durations_parse_humantime() {
        let snap = HubConfig::with_defaults().snapshot();
        assert_eq!(
            snap.get_duration("auth.access_ttl").unwrap(),
            Some(Duration::from_secs(15 * 60))
        );
        assert_eq!(snap.get_duration("nope").unwrap(), None);
    }

    #[test]
    fn malformed_values_name_the_key() {
        let mut cfg = HubConfig::new();
        cfg.set("request.timeout", "soon");
        cfg.set("http.port", "eighty");
        let snap = cfg.snapshot();
        assert!(matches!(
            snap.get_duration("request.timeout"),
            Err(ConfigError::Invalid { key, .. }) if key == "request.timeout"
        ));
        assert!(snap.parse::<u16>("http.port").is_err());
        assert_eq!(snap.require("auth.secret"), Err(ConfigError::Missing("auth.secret".into())));
    }
}
