//! Hostname whitelist for ACME issuance.
//!
//! Names are normalised before comparison: IDNA to ASCII, lowercase, trailing
//! dot removed. IP literals and single-label names are never issuable.

use std::collections::BTreeSet;

use thiserror::Error;
use url::Host;

/// Why a server name was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostRejection {
    #[error("no server name presented")]
    Missing,

    #[error("'{0}' is not a valid hostname")]
    Invalid(String),

    #[error("'{0}' is an IP address")]
    IpLiteral(String),

    #[error("'{0}' is not in the host whitelist")]
    NotAllowed(String),
}

/// Set of hostnames the ACME provider may request certificates for.
#[derive(Debug, Clone, Default)]
pub struct HostWhitelist {
    hosts: BTreeSet<String>,
}

impl HostWhitelist {
    /// Build from configured names. Entries that cannot be normalised are
    /// skipped with a warning.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for host in hosts {
            match normalize(host.as_ref()) {
                Ok(name) => {
                    set.insert(name);
                }
                Err(e) => tracing::warn!(error = %e, "Ignoring whitelist entry"),
            }
        }
        Self { hosts: set }
    }

    /// Check `name` and return its normalised form when allowed.
    pub fn check(&self, name: Option<&str>) -> Result<String, HostRejection> {
        let name = name.ok_or(HostRejection::Missing)?;
        let normalized = normalize(name)?;
        if self.hosts.contains(&normalized) {
            Ok(normalized)
        } else {
            Err(HostRejection::NotAllowed(normalized))
        }
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Canonical form of a DNS name.
pub fn normalize(name: &str) -> Result<String, HostRejection> {
    let trimmed = name.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(HostRejection::Invalid(name.to_string()));
    }
    match Host::parse(trimmed) {
        Ok(Host::Domain(domain)) if domain.contains('.') => Ok(domain),
        Ok(Host::Domain(_)) => Err(HostRejection::Invalid(name.to_string())),
        Ok(Host::Ipv4(_)) | Ok(Host::Ipv6(_)) => Err(HostRejection::IpLiteral(name.to_string())),
        Err(_) => Err(HostRejection::Invalid(name.to_string())),
    }
}
