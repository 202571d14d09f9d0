use serde::Serialize;
use serde_json::Value;

use crate::errors::HubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// The structured result every endpoint produces.
///
/// The HTTP adapter uses `code` as the status line and serializes the rest
/// as the body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: Status,
    #[serde(skip)]
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self::success(200, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: Value) -> Self {
        Self::success(201, message, Some(data))
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::success(200, message, None)
    }

    fn success(code: u16, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: Status::Success,
            code,
            message: message.into(),
            data,
            error: None,
        }
    }

    /// Envelope for an error that has already been sanitized.
    pub fn from_error(err: &HubError) -> Self {
        Self {
            status: Status::Error,
            code: err.code(),
            message: err.message.clone(),
            data: None,
            error: Some(err.to_json()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
