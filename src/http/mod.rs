//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection
//!     → server.rs (Axum setup, shared state)
//!     → control.rs (/_/reload) or pipeline.rs (everything else)
//!     → correlation.rs (user_uuid cookie)
//!     → headers.rs (X-Forwarded-For, hop-by-hop, marker header)
//!     → response.rs (error → status mapping)
//!     → Send to client
//! ```

pub mod control;
pub mod correlation;
pub mod headers;
pub mod pipeline;
pub mod response;
pub mod server;

pub use correlation::{Correlation, CorrelationAssigner};
pub use response::ProxyError;
pub use server::{AppState, HttpServer};
