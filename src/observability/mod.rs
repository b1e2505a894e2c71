//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (tracing events: startup, reload, certificates, errors)
//!
//! The forwarding pipeline produces:
//!     → access_log.rs (one JSON line per handled request)
//! ```
//!
//! # Design Decisions
//! - Diagnostics and access records use separate sinks
//! - Correlation token flows into every access record

pub mod access_log;
pub mod logging;

pub use access_log::{AccessLogger, AccessRecord};
