//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Map proxy failures to gateway-style HTTP status codes
//! - Keep failures local to the request that caused them
//!
//! # Design Decisions
//! - No matching host → 404 (client addressed an unknown host)
//! - Backend unreachable → 502 Bad Gateway
//! - Backend timeouts result in 504 Gateway Timeout

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Per-request failures of the forwarding pipeline.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no backend for host '{0}'")]
    NoRoute(String),

    #[error("upstream request to {backend} failed: {source}")]
    Upstream {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {backend} did not answer within {secs}s")]
    Timeout { backend: String, secs: u64 },

    #[error("cannot build upstream URI: {0}")]
    InvalidUri(#[from] axum::http::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
            ProxyError::Upstream { .. } | ProxyError::InvalidUri(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ProxyError::NoRoute(_) => "no backend for host",
            ProxyError::Upstream { .. } | ProxyError::InvalidUri(_) => "Bad Gateway",
            ProxyError::Timeout { .. } => "Gateway Timeout",
        };
        (status, body).into_response()
    }
}
