//! Diagnostic logging setup.
//!
//! Operational events go through `tracing`; request records go to the
//! access log (see `access_log.rs`).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "hostgate=info,tower_http=info";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects debug output.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "hostgate=debug,tower_http=debug"
    } else {
        DEFAULT_FILTER
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
