//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Backend URLs must be absolute http(s) URLs with a host
//! - Host keys must be non-empty
//! - Ports must be non-zero, marker header must be a valid header pair
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend key must not be empty")]
    EmptyHostKey,

    #[error("backend for '{key}' is not a valid URL '{url}': {reason}")]
    InvalidBackendUrl {
        key: String,
        url: String,
        reason: String,
    },

    #[error("backend for '{key}' uses unsupported scheme '{scheme}'")]
    UnsupportedScheme { key: String, scheme: String },

    #[error("{0} must not be 0")]
    ZeroPort(&'static str),

    #[error("HTTPS port and challenge port are both {0}")]
    PortClash(u16),

    #[error("invalid marker header '{0}'")]
    InvalidMarkerHeader(String),

    #[error("upstream timeout must be at least one second")]
    ZeroTimeout,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (key, raw) in &config.backends {
        if key.trim().is_empty() {
            errors.push(ValidationError::EmptyHostKey);
            continue;
        }
        if let Err(e) = parse_backend_url(key, raw) {
            errors.push(e);
        }
    }

    if config.port == 0 {
        errors.push(ValidationError::ZeroPort("port"));
    }
    if config.uses_acme() {
        if config.port2 == 0 {
            errors.push(ValidationError::ZeroPort("port2"));
        } else if config.port2 == config.port {
            errors.push(ValidationError::PortClash(config.port));
        }
    }

    let marker = &config.marker_header;
    if HeaderName::from_bytes(marker.name.as_bytes()).is_err()
        || HeaderValue::from_str(&marker.value).is_err()
    {
        errors.push(ValidationError::InvalidMarkerHeader(marker.name.clone()));
    }

    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a backend base URL, accepting only absolute http(s) URLs.
pub fn parse_backend_url(key: &str, raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidBackendUrl {
        key: key.to_string(),
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::UnsupportedScheme {
                key: key.to_string(),
                scheme: other.to_string(),
            })
        }
    }

    if url.host_str().is_none() {
        return Err(ValidationError::InvalidBackendUrl {
            key: key.to_string(),
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}
