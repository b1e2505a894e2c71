//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → table.rs (load active snapshot)
//!     → matcher.rs (host key prefix comparison)
//!     → Return: matched Route or None
//!
//! Route Compilation (startup and reload):
//!     ProxyConfig.backends
//!     → Parse backend URLs
//!     → Sort by key length (longest first)
//!     → Freeze as immutable RouteSnapshot
//!     → Publish with one atomic swap
//! ```
//!
//! # Design Decisions
//! - Snapshots immutable at runtime, replaced wholesale on reload
//! - No regex in hot path (prefix matching only)
//! - Deterministic: longest matching key wins

pub mod matcher;
pub mod table;

pub use matcher::Route;
pub use table::{RouteSnapshot, RoutingTable};
