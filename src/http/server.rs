//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router (control endpoint + catch-all proxy)
//! - Hold shared state: routing table, upstream client, access log
//! - Serve over TLS (production) or plain TCP (tests, TLS offload)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    routing::{any, get},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::http::control::{reload_handler, RELOAD_PATH};
use crate::http::correlation::CorrelationAssigner;
use crate::http::pipeline::proxy_handler;
use crate::observability::AccessLogger;
use crate::routing::RoutingTable;

/// Upstream client shared by all requests.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RoutingTable>,
    pub client: UpstreamClient,
    pub access_log: Arc<AccessLogger>,
    pub correlation: CorrelationAssigner,
}

impl AppState {
    pub fn new(routes: Arc<RoutingTable>, access_log: Arc<AccessLogger>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpsConnector::new());
        Self {
            routes,
            client,
            access_log,
            correlation: CorrelationAssigner::new(),
        }
    }
}

/// HTTP(S) front end of the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(RELOAD_PATH, get(reload_handler).post(reload_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The configured router, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve plain HTTP on `listener`.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `listener` with the given rustls configuration.
    pub async fn run_tls(
        self,
        listener: std::net::TcpListener,
        tls: RustlsConfig,
    ) -> Result<(), std::io::Error> {
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTPS server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::from_tcp_rustls(listener, tls).serve(app).await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
