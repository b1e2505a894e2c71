//! Configuration file watcher for hot reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::routing::RoutingTable;

/// A watcher that reloads the routing table when its source file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    table: Arc<RoutingTable>,
}

impl ConfigWatcher {
    /// Create a watcher for the table's own source file.
    pub fn new(table: Arc<RoutingTable>) -> Self {
        Self {
            path: table.source().to_path_buf(),
            table,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let table = self.table;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        if let Err(e) = table.reload() {
                            tracing::error!(error = %e, "Failed to reload config; keeping current routes");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
