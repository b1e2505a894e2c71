//! Header manipulation.
//!
//! # Responsibilities
//! - Extend `X-Forwarded-For` with the peer address
//! - Strip hop-by-hop headers in both directions
//! - Add the proxy marker header to responses
//! - Extract the Host the client asked for

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};

use crate::config::MarkerHeader;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that apply to a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Build the outbound `X-Forwarded-For` value.
///
/// Existing values (possibly spread over several header lines) are kept in
/// order, byte for byte, and the peer address is appended.
pub fn forwarded_for(headers: &HeaderMap, peer: IpAddr) -> Vec<u8> {
    let mut chain = Vec::new();
    for value in headers.get_all(&X_FORWARDED_FOR) {
        let value = value.as_bytes().trim_ascii();
        if value.is_empty() {
            continue;
        }
        chain.extend_from_slice(value);
        chain.extend_from_slice(b", ");
    }
    chain.extend_from_slice(peer.to_string().as_bytes());
    chain
}

/// Replace `X-Forwarded-For` with the chain extended by `peer`.
pub fn append_forwarded_for(headers: &mut HeaderMap, peer: IpAddr) {
    match HeaderValue::from_bytes(&forwarded_for(headers, peer)) {
        Ok(value) => {
            headers.insert(X_FORWARDED_FOR, value);
        }
        Err(e) => tracing::warn!(error = %e, "Cannot extend X-Forwarded-For"),
    }
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Insert the configured marker header.
pub fn insert_marker(headers: &mut HeaderMap, marker: &MarkerHeader) {
    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(marker.name.as_bytes()),
        HeaderValue::from_str(&marker.value),
    ) {
        headers.insert(name, value);
    }
}

/// The Host the client addressed: `Host` header, else the URI authority.
pub fn request_host<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
}
