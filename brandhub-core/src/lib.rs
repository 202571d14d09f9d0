//! brandhub-core: tenant model and request-scoped tenancy for brandhub.
//!
//! Nothing here knows about HTTP or storage. The HTTP adapter builds an
//! [`InboundRequest`], the pipeline resolves a [`Tenant`] through the
//! [`TenantRegistry`] and binds it with [`context::scope`] for the rest of
//! the request.

pub mod config;
pub mod context;
pub mod errors;
pub mod principal;
pub mod registry;
pub mod request;
pub mod response;
pub mod tenant;

pub use config::{ConfigError, HubConfig, HubConfigSnapshot};
pub use errors::{ErrorKind, HubError, HubResult};
pub use principal::{Principal, PrincipalKind};
pub use registry::TenantRegistry;
pub use request::InboundRequest;
pub use response::{ApiResponse, Status};
pub use tenant::{StoreCoordinates, Tenant, TenantContext, TenantName, DEFAULT_TENANT};
