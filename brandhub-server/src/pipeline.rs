//! Request admission.
//!
//! Every routed request goes through the same steps, in order:
//!
//! 1. resolve the tenant from the tenant header
//! 2. bind it to the task with [`context::scope`]
//! 3. start the request deadline
//! 4. authenticate (skipped for public endpoints)
//! 5. open a session on the tenant's store and run the endpoint
//! 6. commit on success, roll back on anything else
//!
//! Sessions stage their writes; the store itself is only locked inside
//! commit, so a slow request never holds up others on the same brand.
//!
//! Errors leave as [`ApiResponse`] envelopes. Internal faults are logged with
//! their cause chain and reach the client as a generic message.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use brandhub_auth::{authenticate, require_admin};
use brandhub_axum::Dispatch;
use brandhub_core::{
    context, ApiResponse, ErrorKind, HubError, InboundRequest, Principal, PrincipalKind, Tenant,
    TenantContext, DEFAULT_TENANT,
};
use brandhub_store::{BrandAdmin, Session};
use tracing::{debug, error, field, info, info_span, warn, Instrument};

use crate::state::{AppState, UnknownTenant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    User,
    Admin,
}

/// Everything an endpoint gets to work with.
pub struct RequestCx<'a> {
    pub state: &'a AppState,
    pub req: &'a InboundRequest,
    pub tenant: Tenant,
    pub principal: Option<Principal>,
    /// Set for [`Access::Admin`] endpoints.
    pub admin: Option<BrandAdmin>,
    pub session: Session,
}

impl RequestCx<'_> {
    /// The authenticated principal; only absent on public endpoints.
    pub fn principal(&self) -> Result<&Principal> {
        self.principal.as_ref().ok_or_else(|| {
            HubError::not_authenticated("Authentication credentials were not provided").into_anyhow()
        })
    }

    pub fn admin(&self) -> Result<&BrandAdmin> {
        self.admin
            .as_ref()
            .ok_or_else(|| HubError::forbidden("Access denied").into_anyhow())
    }
}

#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
    fn access(&self) -> Access;

    async fn handle(&self, cx: &mut RequestCx<'_>) -> Result<ApiResponse>;
}

pub struct Pipeline {
    state: Arc<AppState>,
    endpoints: HashMap<&'static str, Arc<dyn Endpoint>>,
}

impl Pipeline {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            endpoints: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, endpoint: Arc<dyn Endpoint>) {
        self.endpoints.insert(name, endpoint);
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Tenant named by the request header, or "default".
    pub fn resolve_tenant(&self, req: &InboundRequest) -> Result<Tenant> {
        let registry = &self.state.registry;
        let candidate = req
            .header(&self.state.settings.tenant_header)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let Some(name) = candidate else {
            return registry.resolve(DEFAULT_TENANT);
        };
        match registry.resolve(name) {
            Ok(tenant) => Ok(tenant),
            Err(e) => match self.state.settings.unknown_tenant {
                UnknownTenant::Fallback => {
                    debug!(candidate = name, "unknown brand, falling back to default");
                    registry.resolve(DEFAULT_TENANT)
                }
                UnknownTenant::Reject => Err(e),
            },
        }
    }

    async fn admit(
        &self,
        endpoint: &dyn Endpoint,
        req: &InboundRequest,
        tenant: Tenant,
    ) -> Result<ApiResponse> {
        let state = self.state.as_ref();
        let access = endpoint.access();

        let principal = match access {
            Access::Public => None,
            Access::User | Access::Admin => {
                let p = authenticate(&state.tokens, req.bearer_token())?;
                let wanted = if access == Access::Admin {
                    PrincipalKind::Admin
                } else {
                    PrincipalKind::User
                };
                if p.kind != wanted {
                    return Err(HubError::forbidden("Access denied").into_anyhow());
                }
                Some(p)
            }
        };

        let mut session = state.gateway.begin(principal.clone()).await?;
        let admin = match (&principal, access) {
            (Some(p), Access::Admin) => Some(require_admin(&mut session, p).await?),
            _ => None,
        };

        let mut cx = RequestCx {
            state,
            req,
            tenant,
            principal,
            admin,
            session,
        };
        let outcome = endpoint.handle(&mut cx).await;
        let RequestCx { session, .. } = cx;

        match outcome {
            Ok(resp) if resp.is_success() => {
                session.commit()?;
                Ok(resp)
            }
            Ok(resp) => {
                session.rollback();
                Ok(resp)
            }
            Err(e) => {
                session.rollback();
                Err(e)
            }
        }
    }

    fn error_response(&self, err: anyhow::Error) -> ApiResponse {
        let hub = HubError::normalize(err);
        match hub.kind {
            ErrorKind::GeneralError => {
                error!(error = ?hub, "request failed");
                if self.state.settings.expose_internal {
                    ApiResponse::from_error(&hub.sanitize_for_client())
                } else {
                    ApiResponse::from_error(&HubError::general_error("Internal server error"))
                }
            }
            ErrorKind::Forbidden | ErrorKind::NotAuthenticated | ErrorKind::Timeout => {
                warn!(kind = hub.name(), message = %hub.message, "request refused");
                ApiResponse::from_error(&hub.sanitize_for_client())
            }
            _ => {
                debug!(kind = hub.name(), message = %hub.message, "request rejected");
                ApiResponse::from_error(&hub.sanitize_for_client())
            }
        }
    }
}

#[async_trait]
impl Dispatch for Pipeline {
    async fn dispatch(&self, name: &'static str, req: InboundRequest) -> ApiResponse {
        let span = info_span!(
            "request",
            endpoint = name,
            tenant = field::Empty,
            request_id = req.request_id.as_deref().unwrap_or("-"),
        );

        async {
            let Some(endpoint) = self.endpoints.get(name).cloned() else {
                return ApiResponse::from_error(&HubError::not_found("Unknown endpoint"));
            };

            let tenant = match self.resolve_tenant(&req) {
                Ok(t) => t,
                Err(e) => return self.error_response(e),
            };
            tracing::Span::current().record("tenant", field::display(&tenant.name));

            let deadline = self.state.settings.request_timeout;
            let ctx = TenantContext::new(tenant.name.clone());
            let result = context::scope(ctx, async {
                match tokio::time::timeout(deadline, self.admit(endpoint.as_ref(), &req, tenant)).await {
                    Ok(r) => r,
                    // The admit future, and with it the session, is dropped here:
                    // nothing it staged is committed.
                    Err(_) => Err(HubError::timeout("Request timed out").into_anyhow()),
                }
            })
            .await;

            match result {
                Ok(resp) => {
                    info!(code = resp.code, "request complete");
                    resp
                }
                Err(e) => self.error_response(e),
            }
        }
        .instrument(span)
        .await
    }
}
