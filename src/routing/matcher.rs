//! Host prefix matching.
//!
//! # Responsibilities
//! - Compare a route's host key against the Host header as a prefix
//! - Order routes so that the first match is the longest key
//!
//! # Design Decisions
//! - Matching is ASCII case-insensitive (hosts are case-insensitive per HTTP)
//! - Longest prefix wins; equal lengths fall back to lexicographic key order
//! - No regex to guarantee O(n) matching

use std::cmp::Ordering;

use url::Url;

/// A compiled route: host key prefix and the backend it forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Host key as written in the config file.
    pub host_key: String,
    /// Lowercased key used for comparison.
    normalized_key: String,
    /// Backend base URL.
    pub backend: Url,
}

impl Route {
    pub fn new(host_key: impl Into<String>, backend: Url) -> Self {
        let host_key = host_key.into();
        Self {
            normalized_key: host_key.to_ascii_lowercase(),
            host_key,
            backend,
        }
    }

    /// Returns true if `host` starts with this route's key.
    pub fn matches(&self, host: &str) -> bool {
        host.len() >= self.normalized_key.len()
            && host.as_bytes()[..self.normalized_key.len()]
                .eq_ignore_ascii_case(self.normalized_key.as_bytes())
    }

    /// Ordering used by the routing table: longer keys first.
    pub fn precedence(a: &Route, b: &Route) -> Ordering {
        b.normalized_key
            .len()
            .cmp(&a.normalized_key.len())
            .then_with(|| a.normalized_key.cmp(&b.normalized_key))
    }
}
