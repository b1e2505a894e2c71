//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Open access log → Certificates → Start listeners
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - The process runs until a listener fails; there is no drain phase

pub mod startup;

pub use startup::{run, StartupError};
