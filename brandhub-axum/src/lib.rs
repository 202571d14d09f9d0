//! brandhub-axum: Axum adapter for brandhub.
//!
//! Converts HTTP requests into [`brandhub_core::InboundRequest`]s, hands them
//! to a [`Dispatch`] implementation and serializes the resulting
//! [`brandhub_core::ApiResponse`].

pub mod app;
pub mod inbound;
mod error;

pub use app::{AxumApp, Dispatch, REQUEST_ID_HEADER};
pub use error::{Envelope, HubAxumError};
pub use inbound::Inbound;

pub use axum;
