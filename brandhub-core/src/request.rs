use std::collections::HashMap;

use serde_json::Value;

use crate::errors::HubError;

/// Authorization schemes accepted in front of a token.
pub const TOKEN_SCHEMES: &[&str] = &["Bearer", "JWT"];

/// Transport-neutral description of one inbound request.
///
/// Header names are stored lowercased; look them up with [`InboundRequest::header`].
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub path_params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Value,
    pub request_id: Option<String>,
}

impl InboundRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: Value::Null,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Token from `Authorization: <scheme> <token>`.
    ///
    /// A header without a scheme is taken as the bare token. An unknown
    /// scheme or an empty token yields `None`.
    pub fn bearer_token(&self) -> Option<&str> {
        let hv = self.header("authorization")?.trim();
        if hv.is_empty() {
            return None;
        }

        match hv.split_once(' ') {
            Some((scheme, token)) => {
                let token = token.trim();
                let allowed = TOKEN_SCHEMES
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(scheme.trim()));
                (allowed && !token.is_empty()).then_some(token)
            }
            None => Some(hv),
        }
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(|s| s.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// A path parameter parsed as an id; a malformed value is a 400.
    pub fn path_id(&self, name: &str) -> Result<u64, HubError> {
        let raw = self
            .path_param(name)
            .ok_or_else(|| HubError::bad_request(format!("Missing path parameter '{name}'")))?;
        raw.parse::<u64>()
            .map_err(|_| HubError::bad_request(format!("Invalid {name}")))
    }

    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.get(name).filter(|v| !v.is_null())
    }

    /// A string body field, trimmed; empty strings count as missing.
    pub fn body_str(&self, name: &str) -> Option<&str> {
        self.body_field(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Collect several required string fields or fail with one 400 naming
    /// every missing field.
    pub fn require_str<'a>(&'a self, names: &[&str]) -> Result<Vec<&'a str>, HubError> {
        let mut out = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.body_str(name) {
                Some(v) => out.push(v),
                None => missing.push(*name),
            }
        }
        if missing.is_empty() {
            Ok(out)
        } else {
            Err(HubError::bad_request("All fields are required")
                .with_errors(serde_json::json!({ "missing": missing })))
        }
    }
}
