//! brandhub-server: the multi-brand marketplace API.
//!
//! Routes every endpoint in [`services::routes`] through the admission
//! [`Pipeline`]; `/health` bypasses it.

pub mod pipeline;
pub mod services;
pub mod state;
pub mod utils;

use std::sync::Arc;

use brandhub_axum::axum::Json;
use brandhub_axum::{AxumApp, HubAxumError};
use brandhub_core::DEFAULT_TENANT;
use serde_json::{json, Value};

pub use pipeline::{Access, Endpoint, Pipeline, RequestCx};
pub use state::{AppState, Settings, UnknownTenant};

pub fn build(state: Arc<AppState>) -> AxumApp<Pipeline> {
    build_with(state, |_| {})
}

/// Like [`build`], with a hook to register extra endpoints on the pipeline
/// before it is frozen. Route them with [`AxumApp::endpoint`].
pub fn build_with<F>(state: Arc<AppState>, extra: F) -> AxumApp<Pipeline>
where
    F: FnOnce(&mut Pipeline),
{
    let mut pipeline = Pipeline::new(Arc::clone(&state));
    services::configure(&mut pipeline);
    extra(&mut pipeline);

    let mut ax = AxumApp::new(Arc::new(pipeline));
    for (method, path, name) in services::routes() {
        ax = ax.endpoint(method, path, name);
    }

    ax.service("/health", move || {
        let state = Arc::clone(&state);
        async move { health(&state) }
    })
}

fn health(state: &AppState) -> Result<Json<Value>, HubAxumError> {
    let default = state.registry.resolve(DEFAULT_TENANT)?;
    state.gateway.for_tenant(&default.name)?;
    let brands = state.registry.list().iter().filter(|t| t.active).count();
    Ok(Json(json!({ "status": "ok", "brands": brands })))
}
