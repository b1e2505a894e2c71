//! Plain-HTTP listener for ACME HTTP-01 challenges.
//!
//! Challenge paths go to the ACME responder; `GET`/`HEAD` anywhere else is
//! redirected to the HTTPS listener, everything else is refused.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::Request,
    http::{header, uri::Authority, HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower::Service;
use tower_http::trace::TraceLayer;

pub const CHALLENGE_PATH: &str = "/.well-known/acme-challenge/{token}";

pub struct ChallengeListener {
    router: Router,
}

impl ChallengeListener {
    /// `https_port` is used when building redirect targets.
    pub fn new<S>(responder: S, https_port: u16) -> Self
    where
        S: Service<Request<Body>, Error = Infallible> + Clone + Send + Sync + 'static,
        S::Response: IntoResponse,
        S::Future: Send + 'static,
    {
        let router = Router::new()
            .route_service(CHALLENGE_PATH, responder)
            .route_layer(middleware::from_fn(trace_challenge))
            .fallback(move |method: Method, headers: HeaderMap, uri: Uri| async move {
                redirect_to_https(&method, &headers, &uri, https_port)
            })
            .layer(TraceLayer::new_for_http());
        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "ACME challenge listener starting");
        axum::serve(listener, self.router).await?;
        tracing::info!("ACME challenge listener stopped");
        Ok(())
    }
}

async fn trace_challenge(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;
    tracing::info!(
        host = %host,
        path = %path,
        status = response.status().as_u16(),
        "ACME challenge request"
    );
    response
}

fn redirect_to_https(method: &Method, headers: &HeaderMap, uri: &Uri, https_port: u16) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (StatusCode::BAD_REQUEST, "Use HTTPS").into_response();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.parse::<Authority>().ok());
    let Some(host) = host else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let port = if https_port == 443 {
        String::new()
    } else {
        format!(":{https_port}")
    };
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let target = format!("https://{}{port}{path}", host.host());

    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}
