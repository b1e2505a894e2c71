//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Open the access log and select the certificate source
//! - Start background tasks (config watcher, ACME driver)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and reported as `StartupError`
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::watcher::ConfigWatcher;
use crate::config::ConfigError;
use crate::http::{AppState, HttpServer};
use crate::net::{CertificateProvider, ChallengeListener, TlsError};
use crate::observability::AccessLogger;
use crate::routing::RoutingTable;

/// Errors that stop the proxy from starting (or keep running).
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("certificate error: {0}")]
    Tls(#[from] TlsError),

    #[error("cannot open access log {path}: {source}")]
    AccessLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),

    #[error("config watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Start the proxy and serve until a listener fails.
pub async fn run(config_path: &Path, watch: bool) -> Result<(), StartupError> {
    let routes = Arc::new(RoutingTable::load(config_path)?);
    let snapshot = routes.snapshot();
    let config = snapshot.config();

    let access_log = AccessLogger::open(&config.access_log).map_err(|source| StartupError::AccessLog {
        path: config.access_log.clone(),
        source,
    })?;

    if config.reload_token.is_none() {
        tracing::warn!("No reloadToken configured; /_/reload is open to every client");
    }

    // Dropping the watcher stops it, so it lives as long as `run`.
    let _watcher = if watch {
        Some(ConfigWatcher::new(Arc::clone(&routes)).run()?)
    } else {
        None
    };

    let provider = CertificateProvider::from_config(config)?;
    let tls = provider.rustls_config()?;

    let https_listener = bind_std(&config.bind_address, config.port)?;
    let server = HttpServer::new(AppState::new(Arc::clone(&routes), Arc::new(access_log)));

    match provider {
        CertificateProvider::Static(_) => server
            .run_tls(https_listener, tls)
            .await
            .map_err(StartupError::Serve),
        CertificateProvider::Acme(acme) => {
            let (responder, driver) = acme.into_background();
            let http_listener = bind(&config.bind_address, config.port2).await?;
            let challenge = ChallengeListener::new(responder, config.port);

            tokio::spawn(driver);

            tokio::try_join!(
                server.run_tls(https_listener, tls),
                challenge.run(http_listener)
            )
            .map(|_| ())
            .map_err(StartupError::Serve)
        }
    }
}

fn bind_std(host: &str, port: u16) -> Result<std::net::TcpListener, StartupError> {
    std::net::TcpListener::bind((host, port)).map_err(|source| StartupError::Bind {
        addr: format!("{host}:{port}"),
        source,
    })
}

async fn bind(host: &str, port: u16) -> Result<TcpListener, StartupError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| StartupError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })
}
