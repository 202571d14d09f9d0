use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use brandhub_core::{ApiResponse, HubError};

/// Serializes an [`ApiResponse`] with its code as the HTTP status.
#[derive(Debug)]
pub struct Envelope(pub ApiResponse);

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

/// Errors raised by the adapter itself, before a request reaches the pipeline.
#[derive(Debug)]
pub struct HubAxumError(pub anyhow::Error);

impl From<anyhow::Error> for HubAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<HubError> for HubAxumError {
    fn from(e: HubError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for HubAxumError {
    fn into_response(self) -> Response {
        // Structured errors keep their kind, even behind anyhow context.
        if let Some(hub) = HubError::from_anyhow(&self.0) {
            return Envelope(ApiResponse::from_error(&hub.sanitize_for_client())).into_response();
        }

        tracing::error!(error = ?self.0, "unhandled adapter error");
        let hub = HubError::general_error("Internal server error");
        Envelope(ApiResponse::from_error(&hub)).into_response()
    }
}
