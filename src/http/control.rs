//! Control endpoint: `/_/reload`.
//!
//! Reloads the routing table from its source file and answers `ok`.
//! When `reloadToken` is configured the caller must present it as a bearer
//! token; without one the endpoint is open and only network placement
//! protects it.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;

pub const RELOAD_PATH: &str = "/_/reload";

pub async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let snapshot = state.routes.snapshot();
    if let Some(token) = snapshot.config().reload_token.as_deref() {
        if !is_authorized(&headers, token) {
            tracing::warn!("Rejected unauthorized reload request");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let routes = Arc::clone(&state.routes);
    let result = tokio::task::spawn_blocking(move || routes.reload()).await;

    match result {
        Ok(Ok(_)) => (StatusCode::OK, "ok").into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Reload failed; keeping current routes");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {e}")).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Reload task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "reload failed").into_response()
        }
    }
}

fn is_authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == token)
}
