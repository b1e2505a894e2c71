//! ACME certificate acquisition.
//!
//! # Responsibilities
//! - Gate every handshake through the `HostWhitelist` before the ACME
//!   resolver is consulted
//! - Keep one ACME order per whitelisted host, so one failing name does not
//!   hold back the others
//! - Track a per-host acquisition state for logging and inspection
//! - Drive the `rustls-acme` event streams (orders, renewals, errors)
//!
//! # Data Flow
//! ```text
//! ClientHello (SNI)
//!     → HostWhitelist::check      (reject: no certificate, handshake fails)
//!     → per-host ACME resolver    (cached or freshly issued certificate)
//!     → AcquisitionState update   (Issued | Failed)
//! ```
//!
//! Issuance itself happens in the background drivers; the handshake path
//! only reads what they have published.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{uri::Authority, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use futures_util::future::{self, BoxFuture};
use futures_util::{FutureExt, StreamExt};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls_acme::caches::DirCache;
use rustls_acme::tower::TowerHttp01ChallengeService;
use rustls_acme::{AcmeConfig, AcmeState, UseChallenge};
use tower::{Service, ServiceExt};

use crate::config::ProxyConfig;
use crate::http::headers::request_host;
use crate::net::tls::TlsError;
use crate::net::whitelist::{self, HostWhitelist};

/// Where a host stands in certificate acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    #[default]
    Unrequested,
    Pending,
    Issued,
    /// The last handshake got no certificate; the next one retries.
    Failed,
}

/// Whitelist-gated dispatch to one ACME resolver per host.
pub struct AcmeCertResolver {
    whitelist: HostWhitelist,
    issuers: HashMap<String, Arc<dyn ResolvesServerCert>>,
    states: DashMap<String, AcquisitionState>,
}

impl AcmeCertResolver {
    /// `issuers` is keyed by normalised host name.
    pub fn new(whitelist: HostWhitelist, issuers: HashMap<String, Arc<dyn ResolvesServerCert>>) -> Self {
        Self {
            whitelist,
            issuers,
            states: DashMap::new(),
        }
    }

    /// Current acquisition state of `host` (already normalised).
    pub fn state(&self, host: &str) -> AcquisitionState {
        self.states.get(host).map(|s| *s).unwrap_or_default()
    }

    /// Resolve a certificate for `server_name`, calling `fetch` with the
    /// normalised name only when it is whitelisted.
    pub fn acquire<F>(&self, server_name: Option<&str>, fetch: F) -> Option<Arc<CertifiedKey>>
    where
        F: FnOnce(&str) -> Option<Arc<CertifiedKey>>,
    {
        let host = match self.whitelist.check(server_name) {
            Ok(host) => host,
            Err(rejection) => {
                tracing::warn!(
                    server_name = server_name.unwrap_or("-"),
                    reason = %rejection,
                    "Refusing certificate request"
                );
                return None;
            }
        };

        let previous = {
            let mut entry = self.states.entry(host.clone()).or_default();
            let previous = *entry;
            if previous != AcquisitionState::Issued {
                *entry = AcquisitionState::Pending;
            }
            previous
        };
        tracing::debug!(host = %host, previous = ?previous, "Certificate requested");

        let certified = fetch(&host);
        let next = if certified.is_some() {
            AcquisitionState::Issued
        } else {
            AcquisitionState::Failed
        };
        self.states.insert(host.clone(), next);

        match (previous, next) {
            (AcquisitionState::Issued, AcquisitionState::Issued) => {
                tracing::trace!(host = %host, "Serving cached certificate");
            }
            (_, AcquisitionState::Issued) => {
                tracing::info!(host = %host, "Certificate available");
            }
            _ => {
                tracing::warn!(host = %host, "No certificate available yet");
            }
        }

        certified
    }
}

impl fmt::Debug for AcmeCertResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcmeCertResolver")
            .field("whitelist", &self.whitelist)
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}

impl ResolvesServerCert for AcmeCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let server_name = client_hello.server_name().map(str::to_owned);
        self.acquire(server_name.as_deref(), |host| {
            self.issuers.get(host)?.resolve(client_hello)
        })
    }
}

/// HTTP-01 responder that routes each challenge to the order for its `Host`.
#[derive(Clone)]
pub struct ChallengeResponder {
    by_host: Arc<HashMap<String, TowerHttp01ChallengeService>>,
}

impl ChallengeResponder {
    fn service_for<B>(&self, request: &Request<B>) -> Option<TowerHttp01ChallengeService> {
        let host = request_host(request)?;
        let authority: Authority = host.parse().ok()?;
        let host = whitelist::normalize(authority.host()).ok()?;
        self.by_host.get(&host).cloned()
    }
}

impl Service<Request<Body>> for ChallengeResponder {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let service = self.service_for(&request);
        async move {
            match service {
                Some(service) => service.oneshot(request).await.map(IntoResponse::into_response),
                None => Ok(StatusCode::NOT_FOUND.into_response()),
            }
        }
        .boxed()
    }
}

/// ACME mode: resolver, HTTP-01 responder and the background drivers.
pub struct AcmeProvider {
    resolver: Arc<AcmeCertResolver>,
    challenge: ChallengeResponder,
    driver: BoxFuture<'static, ()>,
}

impl AcmeProvider {
    pub fn new(config: &ProxyConfig) -> Result<Self, TlsError> {
        let whitelist = HostWhitelist::new(&config.host_whitelist);
        if whitelist.is_empty() {
            return Err(TlsError::Acme(
                "hostWhitelist has no usable hostnames".to_string(),
            ));
        }

        let settings = &config.acme;
        if settings.contact.is_empty() {
            tracing::warn!("No ACME contact configured; expiry notices cannot be delivered");
        }

        let mut issuers: HashMap<String, Arc<dyn ResolvesServerCert>> = HashMap::new();
        let mut challenges = HashMap::new();
        let mut drivers = Vec::new();
        for host in whitelist.hosts() {
            // Certificates are cached per domain set, so hosts can share the directory.
            let state = AcmeConfig::new([host])
                .contact(settings.contact.iter().map(|email| format!("mailto:{email}")))
                .cache(DirCache::new(settings.cache_dir.clone()))
                .directory_lets_encrypt(settings.production)
                .challenge_type(UseChallenge::Http01)
                .state();

            challenges.insert(host.to_string(), state.http01_challenge_tower_service());
            issuers.insert(host.to_string(), state.resolver());
            drivers.push(drive(host.to_string(), state));
        }

        tracing::info!(
            hosts = issuers.len(),
            cache_dir = %settings.cache_dir.display(),
            production = settings.production,
            "ACME provider configured"
        );

        Ok(Self {
            resolver: Arc::new(AcmeCertResolver::new(whitelist, issuers)),
            challenge: ChallengeResponder {
                by_host: Arc::new(challenges),
            },
            driver: future::join_all(drivers).map(|_| ()).boxed(),
        })
    }

    pub fn resolver(&self) -> Arc<AcmeCertResolver> {
        Arc::clone(&self.resolver)
    }

    /// Split off the pieces that must run beside the HTTPS listener.
    pub fn into_background(self) -> (ChallengeResponder, BoxFuture<'static, ()>) {
        (self.challenge, self.driver)
    }
}

async fn drive(host: String, mut state: AcmeState<io::Error, io::Error>) {
    while let Some(event) = state.next().await {
        match event {
            Ok(ok) => tracing::info!(host = %host, event = ?ok, "ACME event"),
            Err(err) => tracing::error!(host = %host, error = ?err, "ACME error"),
        }
    }
    tracing::warn!(host = %host, "ACME event stream ended");
}
