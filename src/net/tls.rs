//! TLS configuration and certificate loading.
//!
//! # Responsibilities
//! - Load a static PEM chain and key into a rustls `CertifiedKey`
//! - Select the certificate source (static files or ACME) from config
//! - Build the rustls `ServerConfig` shared by every HTTPS connection
//!
//! # Design Decisions
//! - Both sources sit behind `ResolvesServerCert`, so the listener code does
//!   not care where certificates come from
//! - The crypto provider is passed explicitly (`aws-lc-rs`) instead of relying
//!   on a process-wide default being installed

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::crypto::aws_lc_rs;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::net::acme::AcmeProvider;

/// Errors from certificate loading and TLS setup.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),

    #[error("TLS error: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("ACME setup failed: {0}")]
    Acme(String),
}

/// Parse a PEM chain and key. The paths only label errors.
pub fn certified_key_from_pem(
    cert_pem: &[u8],
    cert_path: &Path,
    key_pem: &[u8],
    key_path: &Path,
) -> Result<CertifiedKey, TlsError> {
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut BufReader::new(cert_pem))
        .collect::<Result<_, _>>()
        .map_err(|source| TlsError::Io {
            path: cert_path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
    }

    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut BufReader::new(key_pem))
        .map_err(|source| TlsError::Io {
            path: key_path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(key_path.to_path_buf()))?;

    let signing_key = aws_lc_rs::sign::any_supported_type(&key)?;
    Ok(CertifiedKey::new(certs, signing_key))
}

/// Serves one certificate for every server name.
#[derive(Debug)]
pub struct StaticCertResolver {
    certified: Arc<CertifiedKey>,
}

impl StaticCertResolver {
    /// Load the chain at `cert_path` and the key at `key_path`.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let read = |path: &Path| {
            fs::read(path).map_err(|source| TlsError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        let cert_pem = read(cert_path)?;
        let key_pem = read(key_path)?;

        let certified = certified_key_from_pem(&cert_pem, cert_path, &key_pem, key_path)?;

        tracing::info!(
            cert = %cert_path.display(),
            chain_len = certified.cert.len(),
            "Static certificate loaded"
        );

        Ok(Self {
            certified: Arc::new(certified),
        })
    }

    /// The certificate served for `server_name` (always the same one).
    pub fn certificate_for(&self, _server_name: Option<&str>) -> Arc<CertifiedKey> {
        Arc::clone(&self.certified)
    }
}

impl ResolvesServerCert for StaticCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(self.certificate_for(client_hello.server_name()))
    }
}

/// Where HTTPS certificates come from.
pub enum CertificateProvider {
    Static(Arc<StaticCertResolver>),
    Acme(AcmeProvider),
}

impl CertificateProvider {
    /// Static mode when both certificate paths are set, ACME otherwise.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, TlsError> {
        match config.static_cert_paths() {
            Some((cert, key)) => {
                tracing::info!("Using static certificate files");
                Ok(Self::Static(Arc::new(StaticCertResolver::load(cert, key)?)))
            }
            None => {
                tracing::info!(hosts = ?config.host_whitelist, "Using ACME certificates");
                Ok(Self::Acme(AcmeProvider::new(config)?))
            }
        }
    }

    pub fn resolver(&self) -> Arc<dyn ResolvesServerCert> {
        match self {
            Self::Static(resolver) => Arc::clone(resolver) as Arc<dyn ResolvesServerCert>,
            Self::Acme(acme) => acme.resolver(),
        }
    }

    /// TLS configuration for the HTTPS listener.
    pub fn rustls_config(&self) -> Result<RustlsConfig, TlsError> {
        let config = server_config(self.resolver())?;
        Ok(RustlsConfig::from_config(Arc::new(config)))
    }
}

/// rustls server config with `h2` and `http/1.1` offered over ALPN.
pub fn server_config(resolver: Arc<dyn ResolvesServerCert>) -> Result<ServerConfig, TlsError> {
    let mut config = ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(resolver);
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn pem_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn self_signed() -> (NamedTempFile, NamedTempFile) {
        let generated = rcgen::generate_simple_self_signed(vec!["proxy.test".to_string()]).unwrap();
        (
            pem_file(&generated.cert.pem()),
            pem_file(&generated.key_pair.serialize_pem()),
        )
    }

    #[test]
    fn test_static_certificate_same_for_every_name() {
        let (cert, key) = self_signed();
        let resolver = StaticCertResolver::load(cert.path(), key.path()).unwrap();

        let a = resolver.certificate_for(Some("a.example.com"));
        let b = resolver.certificate_for(Some("b.example.org"));
        let none = resolver.certificate_for(None);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.cert, none.cert);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let (cert, _key) = self_signed();
        let empty = pem_file("");
        assert!(matches!(
            StaticCertResolver::load(cert.path(), empty.path()),
            Err(TlsError::NoPrivateKey(_))
        ));
    }

    #[test]
    fn test_missing_certificate_is_an_error() {
        let (_cert, key) = self_signed();
        let empty = pem_file("");
        assert!(matches!(
            StaticCertResolver::load(empty.path(), key.path()),
            Err(TlsError::NoCertificates(_))
        ));
        assert!(matches!(
            StaticCertResolver::load(Path::new("/nonexistent/cert.pem"), key.path()),
            Err(TlsError::Io { .. })
        ));
    }

    #[test]
    fn test_server_config_alpn() {
        let (cert, key) = self_signed();
        let resolver = Arc::new(StaticCertResolver::load(cert.path(), key.path()).unwrap());
        let config = server_config(resolver).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }
}
