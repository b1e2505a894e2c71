//! Route lookup and atomic reload.
//!
//! # Responsibilities
//! - Compile a `ProxyConfig` into an ordered route list
//! - Publish compiled snapshots atomically
//! - Look up the backend for a Host header
//!
//! # Design Decisions
//! - Snapshots are immutable; reload builds a new one and swaps the pointer
//! - A failed load never touches the active snapshot
//! - Explicit `None` for no-match rather than a silent default

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::validation::{parse_backend_url, validate_config};
use crate::config::{load_config, ConfigError, ProxyConfig};
use crate::routing::matcher::Route;

/// An immutable, compiled view of one configuration.
#[derive(Debug)]
pub struct RouteSnapshot {
    config: ProxyConfig,
    routes: Vec<Route>,
}

impl RouteSnapshot {
    /// Compile a configuration into a snapshot.
    pub fn compile(config: ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let mut routes = config
            .backends
            .iter()
            .map(|(key, raw)| {
                parse_backend_url(key, raw)
                    .map(|url| Route::new(key.clone(), url))
                    .map_err(|e| ConfigError::Validation(vec![e]))
            })
            .collect::<Result<Vec<_>, _>>()?;
        routes.sort_by(Route::precedence);

        Ok(Self { config, routes })
    }

    /// Find the route whose key is the longest prefix of `host`.
    pub fn lookup(&self, host: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(host))
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Compiled routes in match order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// The reloadable routing table shared by every request.
#[derive(Debug)]
pub struct RoutingTable {
    source: PathBuf,
    active: ArcSwap<RouteSnapshot>,
}

impl RoutingTable {
    /// Load the initial table from a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let snapshot = RouteSnapshot::compile(load_config(path)?)?;
        tracing::info!(
            path = %path.display(),
            routes = snapshot.routes.len(),
            "Routing table loaded"
        );
        Ok(Self {
            source: path.to_path_buf(),
            active: ArcSwap::from_pointee(snapshot),
        })
    }

    /// Build a table from an in-memory config. `source` is used by `reload`.
    pub fn from_config(
        source: impl Into<PathBuf>,
        config: ProxyConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            source: source.into(),
            active: ArcSwap::from_pointee(RouteSnapshot::compile(config)?),
        })
    }

    /// Re-read the source file and publish it.
    ///
    /// On error the active snapshot is left untouched.
    pub fn reload(&self) -> Result<Arc<RouteSnapshot>, ConfigError> {
        let config = load_config(&self.source).inspect_err(|e| {
            tracing::warn!(path = %self.source.display(), error = %e, "Reload rejected");
        })?;
        self.replace(config)
    }

    /// Compile `config` and publish it as the active snapshot.
    pub fn replace(&self, config: ProxyConfig) -> Result<Arc<RouteSnapshot>, ConfigError> {
        let next = Arc::new(RouteSnapshot::compile(config)?);
        let previous = self.active.swap(Arc::clone(&next));

        if previous.config.listener_fingerprint() != next.config.listener_fingerprint() {
            tracing::warn!("Listener settings changed; ports, TLS mode and access log apply after restart");
        }
        tracing::info!(routes = next.routes.len(), "Routing table reloaded");
        Ok(next)
    }

    /// The currently active snapshot.
    pub fn snapshot(&self) -> Arc<RouteSnapshot> {
        self.active.load_full()
    }

    /// Look up `host` against the active snapshot.
    pub fn lookup(&self, host: &str) -> Option<Route> {
        self.active.load().lookup(host).cloned()
    }

    /// Path the table is reloaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom, Write};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn config(backends: &[(&str, &str)]) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        for (k, v) in backends {
            config.backends.insert(k.to_string(), v.to_string());
        }
        config
    }

    fn write_config(file: &mut tempfile::NamedTempFile, json: &str) {
        let f = file.as_file_mut();
        f.set_len(0).unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f.flush().unwrap();
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RoutingTable::from_config(
            "unused.json",
            config(&[
                ("app", "http://10.0.0.1:1"),
                ("app.example", "http://10.0.0.2:2"),
            ]),
        )
        .unwrap();

        let route = table.lookup("app.example.com").unwrap();
        assert_eq!(route.host_key, "app.example");
        assert_eq!(route.backend.as_str(), "http://10.0.0.2:2/");

        let route = table.lookup("application.test").unwrap();
        assert_eq!(route.host_key, "app");
    }

    #[test]
    fn test_no_match() {
        let table =
            RoutingTable::from_config("unused.json", config(&[("app.", "http://10.0.0.1:1")]))
                .unwrap();
        assert!(table.lookup("other.example.com").is_none());
        assert!(table.lookup("").is_none());
    }

    #[test]
    fn test_failed_reload_keeps_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_config(&mut file, r#"{"backends": {"app.": "http://10.0.0.1:1"}}"#);
        let table = RoutingTable::load(file.path()).unwrap();
        let before = table.lookup("app.example.com");

        write_config(&mut file, r#"{"backends": {"app.": "#);
        assert!(matches!(table.reload(), Err(ConfigError::Parse(_))));
        assert_eq!(table.lookup("app.example.com"), before);

        write_config(&mut file, r#"{"backends": {"app.": "not a url"}}"#);
        assert!(matches!(table.reload(), Err(ConfigError::Validation(_))));
        assert_eq!(table.lookup("app.example.com"), before);

        write_config(&mut file, r#"{"backends": {"new.": "http://10.0.0.9:9"}}"#);
        table.reload().unwrap();
        assert!(table.lookup("app.example.com").is_none());
        assert!(table.lookup("new.example.com").is_some());
    }

    #[test]
    fn test_reload_is_atomic_for_readers() {
        let gen_a = config(&[
            ("a.", "http://10.0.0.1:1"),
            ("b.", "http://10.0.0.1:1"),
            ("c.", "http://10.0.0.1:1"),
        ]);
        let gen_b = config(&[
            ("a.", "http://10.0.0.2:2"),
            ("b.", "http://10.0.0.2:2"),
            ("c.", "http://10.0.0.2:2"),
        ]);
        let table = Arc::new(RoutingTable::from_config("unused.json", gen_a.clone()).unwrap());
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    let mut observed = 0usize;
                    loop {
                        let snapshot = table.snapshot();
                        let ports: Vec<_> = ["a.x", "b.x", "c.x"]
                            .iter()
                            .map(|h| snapshot.lookup(h).unwrap().backend.port())
                            .collect();
                        assert!(ports.iter().all(|p| *p == ports[0]), "torn table: {ports:?}");
                        observed += 1;
                        if stop.load(Ordering::Relaxed) {
                            break observed;
                        }
                    }
                })
            })
            .collect();

        for i in 0..500 {
            let next = if i % 2 == 0 { gen_b.clone() } else { gen_a.clone() };
            table.replace(next).unwrap();
        }
        stop.store(true, Ordering::Relaxed);

        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
    }
}
