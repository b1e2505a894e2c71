//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! Field names follow the JSON file format (`sslCertPath`, `hostWhitelist`, ...).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Host key (prefix of the Host header) to backend base URL.
    pub backends: BTreeMap<String, String>,

    /// HTTPS listen port.
    pub port: u16,

    /// Plain-HTTP port for ACME HTTP-01 challenges.
    pub port2: u16,

    /// Address both listeners bind to.
    pub bind_address: String,

    /// Static certificate chain (PEM). Static mode needs both paths.
    pub ssl_cert_path: Option<PathBuf>,

    /// Static private key (PEM).
    pub ssl_key_path: Option<PathBuf>,

    /// Hostnames the ACME provider may issue certificates for.
    pub host_whitelist: Vec<String>,

    /// Access log file, one JSON record per line.
    pub access_log: PathBuf,

    /// ACME account and cache settings.
    pub acme: AcmeSettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Header injected into every proxied response.
    pub marker_header: MarkerHeader,

    /// Bearer token required by `/_/reload` when set.
    pub reload_token: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backends: BTreeMap::new(),
            port: 443,
            port2: 80,
            bind_address: "0.0.0.0".to_string(),
            ssl_cert_path: None,
            ssl_key_path: None,
            host_whitelist: Vec::new(),
            access_log: PathBuf::from("access.log"),
            acme: AcmeSettings::default(),
            timeouts: TimeoutConfig::default(),
            marker_header: MarkerHeader::default(),
            reload_token: None,
        }
    }
}

impl ProxyConfig {
    /// Static certificate paths, when both are configured and non-empty.
    pub fn static_cert_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.ssl_cert_path, &self.ssl_key_path) {
            (Some(cert), Some(key))
                if !cert.as_os_str().is_empty() && !key.as_os_str().is_empty() =>
            {
                Some((cert, key))
            }
            _ => None,
        }
    }

    /// True when certificates come from the ACME provider.
    pub fn uses_acme(&self) -> bool {
        self.static_cert_paths().is_none()
    }

    /// Listener-level settings only read at startup.
    ///
    /// Compared on reload so changes that need a restart can be reported.
    pub fn listener_fingerprint(&self) -> (u16, u16, &str, bool, &PathBuf) {
        (
            self.port,
            self.port2,
            self.bind_address.as_str(),
            self.uses_acme(),
            &self.access_log,
        )
    }
}

/// ACME account and cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AcmeSettings {
    /// Directory holding the account key and issued certificates.
    pub cache_dir: PathBuf,

    /// Contact emails registered with the ACME account.
    pub contact: Vec<String>,

    /// Use the Let's Encrypt production directory (staging otherwise).
    pub production: bool,
}

impl Default for AcmeSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("certs"),
            contact: Vec::new(),
            production: true,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// Time allowed for the backend to produce response headers, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { upstream_secs: 30 }
    }
}

/// Fixed response header marking a response as proxied.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarkerHeader {
    pub name: String,
    pub value: String,
}

impl Default for MarkerHeader {
    fn default() -> Self {
        Self {
            name: "X-Proxied-By".to_string(),
            value: "hostgate".to_string(),
        }
    }
}
