use std::collections::HashMap;

use axum::extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request};
use brandhub_core::{HubError, InboundRequest};
use serde_json::{json, Value};

use crate::HubAxumError;

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 1024 * 1024;

/// Extracts an [`InboundRequest`] from any axum request.
///
/// An empty body becomes `null`; a body that is not JSON is a 400.
#[derive(Debug)]
pub struct Inbound(pub InboundRequest);

impl<S> FromRequest<S> for Inbound
where
    S: Send + Sync,
{
    type Rejection = HubAxumError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let path_params: HashMap<String, String> =
            match RawPathParams::from_request_parts(&mut parts, state).await {
                Ok(raw) => raw
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                Err(_) => HashMap::new(),
            };

        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .map_err(|e| {
                HubError::bad_request("Invalid query string")
                    .with_errors(json!({ "query": [e.to_string()] }))
            })?;

        let mut headers = HashMap::new();
        for (k, v) in parts.headers.iter() {
            if let Ok(s) = v.to_str() {
                headers.insert(k.as_str().to_ascii_lowercase(), s.to_string());
            }
        }
        let request_id = headers.get("x-request-id").cloned();

        let bytes = axum::body::to_bytes(body, BODY_LIMIT)
            .await
            .map_err(|_| HubError::bad_request("Request body is too large or unreadable"))?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice::<Value>(&bytes).map_err(|e| {
                HubError::bad_request("Failed to parse the request body as JSON")
                    .with_errors(json!({ "_schema": [e.to_string()] }))
            })?
        };

        Ok(Inbound(InboundRequest {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            headers,
            path_params,
            query,
            body,
            request_id,
        }))
    }
}
