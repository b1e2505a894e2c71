//! Per-request forwarding pipeline.
//!
//! ```text
//! correlate → X-Forwarded-For → match host → forward → mark → capture status → access log
//! ```
//!
//! Every request handled here produces exactly one access record, including
//! requests that end in a 404 or a gateway error.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use url::Url;

use crate::config::MarkerHeader;
use crate::http::headers;
use crate::http::response::ProxyError;
use crate::http::server::AppState;
use crate::observability::AccessRecord;
use crate::routing::RouteSnapshot;

/// What the pipeline knows about one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Peer address as seen on the socket, before any forwarding headers.
    pub client: SocketAddr,
    pub token: String,
    pub method: String,
    /// Host header as sent by the client.
    pub host: String,
    pub path: String,
    /// Host key of the matched route, once known.
    pub host_key: Option<String>,
}

impl RequestContext {
    pub fn access_record(&self, status: StatusCode) -> AccessRecord {
        AccessRecord {
            uuid: self.token.clone(),
            remote_addr: self.client.to_string(),
            method: self.method.clone(),
            host: self.host.clone(),
            path: self.path.clone(),
            status: status.as_u16(),
        }
    }
}

/// Catch-all proxy handler.
pub async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    // One snapshot for the whole request, even if a reload lands meanwhile.
    let snapshot = state.routes.snapshot();

    let correlation = state.correlation.assign(request.headers());
    let mut ctx = RequestContext {
        client,
        token: correlation.token.to_string(),
        method: request.method().to_string(),
        host: headers::request_host(&request).unwrap_or_default(),
        path: request.uri().path().to_string(),
        host_key: None,
    };

    headers::append_forwarded_for(request.headers_mut(), client.ip());

    let mut response = match forward(&state, &snapshot, &mut ctx, request).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ProxyError::NoRoute(host) => {
                    tracing::warn!(client = %client, host = %host, "No backend for host");
                }
                other => {
                    tracing::error!(client = %client, host = %ctx.host, error = %other, "Proxy error");
                }
            }
            e.into_response()
        }
    };

    if let Some(cookie) = correlation.set_cookie() {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }

    state.access_log.record(&ctx.access_record(response.status()));
    response
}

async fn forward(
    state: &AppState,
    snapshot: &RouteSnapshot,
    ctx: &mut RequestContext,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let route = snapshot
        .lookup(&ctx.host)
        .ok_or_else(|| ProxyError::NoRoute(ctx.host.clone()))?;
    ctx.host_key = Some(route.host_key.clone());

    let (mut parts, body) = request.into_parts();
    headers::strip_hop_by_hop(&mut parts.headers);
    // HTTP/2 carries the host in the authority only; keep it once the URI is rewritten.
    if !parts.headers.contains_key(header::HOST) {
        if let Ok(value) = HeaderValue::from_str(&ctx.host) {
            parts.headers.insert(header::HOST, value);
        }
    }
    parts.uri = upstream_uri(&route.backend, &parts.uri)?;
    // The upstream connection is negotiated independently of the client's.
    parts.version = Version::HTTP_11;

    tracing::debug!(
        host = %ctx.host,
        route = %route.host_key,
        upstream = %parts.uri,
        "Forwarding request"
    );

    let secs = snapshot.config().timeouts.upstream_secs;
    let upstream = Request::from_parts(parts, body);
    let response = tokio::time::timeout(Duration::from_secs(secs), state.client.request(upstream))
        .await
        .map_err(|_| ProxyError::Timeout {
            backend: route.backend.to_string(),
            secs,
        })?
        .map_err(|source| ProxyError::Upstream {
            backend: route.backend.to_string(),
            source,
        })?;

    Ok(downstream(response, &snapshot.config().marker_header))
}

/// Backend response as sent back to the client.
fn downstream(response: hyper::Response<Incoming>, marker: &MarkerHeader) -> Response {
    let (mut parts, body) = response.into_parts();
    headers::strip_hop_by_hop(&mut parts.headers);
    headers::insert_marker(&mut parts.headers, marker);
    Response::from_parts(parts, Body::new(body))
}

/// Rewrite `original` to target `backend`, joining paths and merging queries.
pub fn upstream_uri(backend: &Url, original: &Uri) -> Result<Uri, ProxyError> {
    let path = join_paths(backend.path(), original.path());
    let query = match (backend.query().filter(|q| !q.is_empty()), original.query()) {
        (Some(base), Some(req)) => Some(format!("{base}&{req}")),
        (Some(base), None) => Some(base.to_string()),
        (None, req) => req.map(str::to_string),
    };
    let path_and_query = match query {
        Some(q) => format!("{path}?{q}"),
        None => path,
    };

    let host = backend.host_str().unwrap_or_default();
    let authority = match backend.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(Uri::builder()
        .scheme(backend.scheme())
        .authority(authority)
        .path_and_query(path_and_query)
        .build()?)
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
