//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into a routing snapshot
//!
//! On reload (/_/reload or watcher.rs):
//!     loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<RouteSnapshot>
//!     → failures keep the active snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AcmeSettings, MarkerHeader, ProxyConfig, TimeoutConfig};
pub use validation::ValidationError;
