use std::sync::Arc;

use async_trait::async_trait;
use axum::handler::Handler;
use axum::http::{HeaderName, Method};
use axum::routing::{self, MethodFilter};
use axum::Router;
use brandhub_core::{ApiResponse, InboundRequest};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::{Envelope, Inbound};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Whatever turns a named endpoint plus an inbound request into a response.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    async fn dispatch(&self, endpoint: &'static str, req: InboundRequest) -> ApiResponse;
}

pub struct AxumApp<D: Dispatch> {
    pub dispatcher: Arc<D>,
    pub router: Router<()>,
}

impl<D: Dispatch> Clone for AxumApp<D> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            router: self.router.clone(),
        }
    }
}

impl<D: Dispatch> AxumApp<D> {
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self {
            dispatcher,
            router: Router::new(),
        }
    }

    /// Route `method path` to the dispatcher under `name`.
    pub fn endpoint(mut self, method: Method, path: &str, name: &'static str) -> Self {
        let dispatcher = Arc::clone(&self.dispatcher);
        let handler = move |Inbound(req): Inbound| {
            let dispatcher = Arc::clone(&dispatcher);
            async move { Envelope(dispatcher.dispatch(name, req).await) }
        };

        let filter = match MethodFilter::try_from(method.clone()) {
            Ok(f) => f,
            Err(_) => {
                tracing::warn!(%method, path, "unsupported method, endpoint not routed");
                return self;
            }
        };
        self.router = self.router.route(path, routing::on(filter, handler));
        self
    }

    /// A plain GET handler that bypasses the dispatcher.
    pub fn service<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, routing::get(handler));
        self
    }

    /// The router with request-id and trace layers applied.
    pub fn into_router(self) -> Router<()> {
        let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
        self.router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = ?listener.local_addr()?, "listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}
